//! Voxel grids sampled from Gaussian-smeared atoms.
//!
//! [`PotentialGrid`] is the output of the rasterizer: a single cubic grid or a
//! stack of one cubic grid per element. [`GridGeometry`] describes the cube
//! shared by every grid of a dataset run.

pub mod rasterizer;

use crate::core::models::atom::Element;
use ndarray::{Array3, Array4, ArrayD, ArrayView3, ArrayViewD, Axis, Ix3, Ix4};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridShapeError {
    #[error("Grid must be n×n×n or {channels}×n×n×n, got shape {shape:?}")]
    Unsupported { shape: Vec<usize>, channels: usize },
}

/// The cube sampled by a grid: `n_points` voxels per axis over `physic_length` Å.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub n_points: usize,
    pub physic_length: f64,
}

impl GridGeometry {
    pub fn new(n_points: usize, physic_length: f64) -> Self {
        Self {
            n_points,
            physic_length,
        }
    }

    /// Distance between neighbouring voxel centers, in Å.
    pub fn spacing(&self) -> f64 {
        self.physic_length / self.n_points as f64
    }

    /// Voxel-center coordinates along one axis.
    ///
    /// The `n_points` centers start at 0 with [`Self::spacing`] steps and are then
    /// shifted so the first and last center sit symmetrically around zero.
    pub fn axis_coordinates(&self) -> Vec<f64> {
        let h = self.spacing();
        let half_span = (self.physic_length - h) / 2.0;
        (0..self.n_points).map(|i| i as f64 * h - half_span).collect()
    }

    /// Number of voxels in one channel.
    pub fn voxel_count(&self) -> usize {
        self.n_points.pow(3)
    }
}

/// A rasterized potential, stored in single precision.
#[derive(Debug, Clone, PartialEq)]
pub enum PotentialGrid {
    /// One n³ grid summed over every atom.
    Single(Array3<f32>),
    /// A 5×n³ stack with channels ordered H, C, N, O, F.
    PerElement(Array4<f32>),
}

impl PotentialGrid {
    pub fn channel_count(&self) -> usize {
        match self {
            PotentialGrid::Single(_) => 1,
            PotentialGrid::PerElement(data) => data.len_of(Axis(0)),
        }
    }

    /// Voxels per axis.
    pub fn n_points(&self) -> usize {
        match self {
            PotentialGrid::Single(data) => data.len_of(Axis(0)),
            PotentialGrid::PerElement(data) => data.len_of(Axis(1)),
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            PotentialGrid::Single(data) => data.shape(),
            PotentialGrid::PerElement(data) => data.shape(),
        }
    }

    /// The channel holding `element`'s potential; `None` for single-channel grids.
    pub fn channel(&self, element: Element) -> Option<ArrayView3<'_, f32>> {
        match self {
            PotentialGrid::Single(_) => None,
            PotentialGrid::PerElement(data) => Some(data.index_axis(Axis(0), element.channel())),
        }
    }

    pub fn view(&self) -> ArrayViewD<'_, f32> {
        match self {
            PotentialGrid::Single(data) => data.view().into_dyn(),
            PotentialGrid::PerElement(data) => data.view().into_dyn(),
        }
    }

    pub fn into_dyn(self) -> ArrayD<f32> {
        match self {
            PotentialGrid::Single(data) => data.into_dyn(),
            PotentialGrid::PerElement(data) => data.into_dyn(),
        }
    }

    /// Rebuilds a grid from a dynamically shaped array, checking that every
    /// spatial axis has the same length.
    pub fn from_dyn(data: ArrayD<f32>) -> Result<Self, GridShapeError> {
        let shape = data.shape().to_vec();
        let unsupported = || GridShapeError::Unsupported {
            shape: shape.clone(),
            channels: Element::COUNT,
        };
        match shape.as_slice() {
            [a, b, c] if a == b && b == c => data
                .into_dimensionality::<Ix3>()
                .map(PotentialGrid::Single)
                .map_err(|_| unsupported()),
            [channels, a, b, c] if *channels == Element::COUNT && a == b && b == c => data
                .into_dimensionality::<Ix4>()
                .map(PotentialGrid::PerElement)
                .map_err(|_| unsupported()),
            _ => Err(unsupported()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_coordinates_are_symmetric_and_evenly_spaced() {
        let geometry = GridGeometry::new(32, 12.0);
        let axis = geometry.axis_coordinates();

        assert_eq!(axis.len(), 32);
        assert!((geometry.spacing() - 0.375).abs() < 1e-12);
        assert!((axis[0] + axis[31]).abs() < 1e-12);
        assert!((axis[0] - -5.8125).abs() < 1e-12);
        for pair in axis.windows(2) {
            assert!((pair[1] - pair[0] - 0.375).abs() < 1e-12);
        }
    }

    #[test]
    fn from_dyn_recognizes_both_layouts() {
        let single = PotentialGrid::from_dyn(ArrayD::zeros(vec![4, 4, 4])).unwrap();
        assert_eq!(single.channel_count(), 1);
        assert_eq!(single.n_points(), 4);
        assert!(single.channel(Element::H).is_none());

        let multi = PotentialGrid::from_dyn(ArrayD::zeros(vec![5, 3, 3, 3])).unwrap();
        assert_eq!(multi.channel_count(), 5);
        assert_eq!(multi.n_points(), 3);
        assert_eq!(multi.shape(), &[5, 3, 3, 3]);
        assert_eq!(multi.channel(Element::F).unwrap().shape(), &[3, 3, 3]);
    }

    #[test]
    fn from_dyn_rejects_non_cubic_or_wrong_channel_count() {
        assert!(PotentialGrid::from_dyn(ArrayD::zeros(vec![4, 4, 3])).is_err());
        assert!(PotentialGrid::from_dyn(ArrayD::zeros(vec![4, 3, 3, 3])).is_err());
        assert!(PotentialGrid::from_dyn(ArrayD::zeros(vec![9])).is_err());
    }
}
