use super::{GridGeometry, PotentialGrid};
use crate::core::models::atom::{Atom, Element};
use itertools::{Itertools, MinMaxResult};
use nalgebra::{Point3, Vector3};
use ndarray::{Array3, Array4};
use std::time::Instant;
use thiserror::Error;
use tracing::{instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error, PartialEq)]
pub enum RasterError {
    #[error("Cannot rasterize an empty atom set")]
    EmptyAtomSet,
    #[error("Non-finite potential value in channel {channel} at voxel {index}")]
    NonFinite { channel: usize, index: usize },
    #[error("Rasterization exceeded its deadline")]
    DeadlineExceeded,
    /// Voxel buffers are always sized from the grid geometry, so this only
    /// signals a broken internal invariant.
    #[error("Voxel buffer does not match the grid shape")]
    Layout,
}

/// How each atom's Gaussian is scaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Weighting {
    /// Peak height equals the atomic number.
    AtomicNumber,
    /// Peak height is the same constant for every atom.
    Constant(f64),
}

impl Weighting {
    fn weight(&self, element: Element) -> f64 {
        match self {
            Weighting::AtomicNumber => element.atomic_number() as f64,
            Weighting::Constant(alpha) => *alpha,
        }
    }
}

/// Layout of the produced grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    /// All atoms summed into one grid.
    #[default]
    Single,
    /// One grid per element.
    PerElement,
}

/// Atom set whose extent decides the alignment offset of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetScope {
    /// One offset from the whole molecule, shared by every channel.
    #[default]
    Molecule,
    /// Each per-element channel is centered on its own element group.
    ElementGroup,
}

/// Evaluates sums of isotropic Gaussians at the voxel centers of a cube.
///
/// `field(v) = Σ weight(a) · exp(-|v - a|² / (2γ²))`. Distances, exponentials
/// and sums are evaluated in `f64`; each finished channel is rounded once to
/// `f32`.
#[derive(Debug, Clone)]
pub struct GaussianRasterizer {
    geometry: GridGeometry,
    gamma: f64,
    alpha: f64,
    offset_scope: OffsetScope,
    axis: Vec<f64>,
}

impl GaussianRasterizer {
    /// Creates a rasterizer for one dataset run.
    ///
    /// # Arguments
    ///
    /// * `geometry` - The sampled cube.
    /// * `gamma` - Gaussian width in Å; must be positive.
    /// * `alpha` - Peak height used by [`ChannelMode::PerElement`].
    pub fn new(geometry: GridGeometry, gamma: f64, alpha: f64) -> Self {
        debug_assert!(gamma > 0.0 && geometry.n_points > 0);
        Self {
            axis: geometry.axis_coordinates(),
            geometry,
            gamma,
            alpha,
            offset_scope: OffsetScope::Molecule,
        }
    }

    /// Only affects [`ChannelMode::PerElement`]; a single grid always uses the
    /// whole molecule.
    pub fn with_offset_scope(mut self, scope: OffsetScope) -> Self {
        self.offset_scope = scope;
        self
    }

    pub fn offset_scope(&self) -> OffsetScope {
        self.offset_scope
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    /// The weighting a mode uses unless overridden: atomic numbers for a single
    /// grid, the constant `alpha` for per-element grids.
    pub fn default_weighting(&self, mode: ChannelMode) -> Weighting {
        match mode {
            ChannelMode::Single => Weighting::AtomicNumber,
            ChannelMode::PerElement => Weighting::Constant(self.alpha),
        }
    }

    pub fn rasterize(&self, atoms: &[Atom], mode: ChannelMode) -> Result<PotentialGrid, RasterError> {
        self.rasterize_with(atoms, mode, self.default_weighting(mode), None)
    }

    /// Rasterizes `atoms` with an explicit weighting and an optional deadline.
    ///
    /// By default the alignment offset is computed once from the whole atom set,
    /// so every channel of a per-element grid shares the same voxel positions.
    /// [`OffsetScope::ElementGroup`] recenters each channel on its own atoms.
    /// Elements without atoms leave an all-zero channel.
    ///
    /// # Errors
    ///
    /// Fails on an empty atom set, on any non-finite voxel value, or when the
    /// deadline passes; the deadline is checked between x-slabs.
    #[instrument(level = "trace", skip_all, fields(atoms = atoms.len(), mode = ?mode))]
    pub fn rasterize_with(
        &self,
        atoms: &[Atom],
        mode: ChannelMode,
        weighting: Weighting,
        deadline: Option<Instant>,
    ) -> Result<PotentialGrid, RasterError> {
        let offset = alignment_offset(atoms).ok_or(RasterError::EmptyAtomSet)?;
        trace!(?offset, "Computed grid alignment offset.");
        let n = self.geometry.n_points;

        match mode {
            ChannelMode::Single => {
                let sources: Vec<_> = atoms
                    .iter()
                    .map(|a| (a.position, weighting.weight(a.element)))
                    .collect();
                let data = self.channel_field(&sources, &offset, deadline)?;
                let data = to_single_precision(data, 0)?;
                Ok(PotentialGrid::Single(
                    Array3::from_shape_vec((n, n, n), data).map_err(|_| RasterError::Layout)?,
                ))
            }
            ChannelMode::PerElement => {
                let mut stacked = Vec::with_capacity(Element::COUNT * self.geometry.voxel_count());
                for element in Element::ALL {
                    let group: Vec<Atom> = atoms
                        .iter()
                        .filter(|a| a.element == element)
                        .cloned()
                        .collect();
                    if group.is_empty() {
                        stacked.resize(stacked.len() + self.geometry.voxel_count(), 0.0);
                        continue;
                    }
                    let group_offset = match self.offset_scope {
                        OffsetScope::Molecule => offset,
                        OffsetScope::ElementGroup => alignment_offset(&group).unwrap_or(offset),
                    };
                    let sources: Vec<_> = group
                        .iter()
                        .map(|a| (a.position, weighting.weight(element)))
                        .collect();
                    let data = self.channel_field(&sources, &group_offset, deadline)?;
                    stacked.extend(to_single_precision(data, element.channel())?);
                }
                Ok(PotentialGrid::PerElement(
                    Array4::from_shape_vec((Element::COUNT, n, n, n), stacked)
                        .map_err(|_| RasterError::Layout)?,
                ))
            }
        }
    }

    /// Sums the Gaussians of `sources` over the cube, row-major in (x, y, z).
    ///
    /// The Gaussian factorizes per axis, so each source contributes
    /// `w · gx[i] · gy[j] · gz[k]` with three precomputed 1-D profiles.
    fn channel_field(
        &self,
        sources: &[(Point3<f64>, f64)],
        offset: &Vector3<f64>,
        deadline: Option<Instant>,
    ) -> Result<Vec<f64>, RasterError> {
        let n = self.geometry.n_points;
        let inv_two_gamma_sq = 1.0 / (2.0 * self.gamma * self.gamma);
        let profile = |shift: f64, center: f64| -> Vec<f64> {
            self.axis
                .iter()
                .map(|&c| {
                    let d = c + shift - center;
                    (-d * d * inv_two_gamma_sq).exp()
                })
                .collect()
        };
        let profiles: Vec<_> = sources
            .iter()
            .map(|(p, w)| {
                (
                    *w,
                    profile(offset.x, p.x),
                    profile(offset.y, p.y),
                    profile(offset.z, p.z),
                )
            })
            .collect();

        let fill_slab = |(i, slab): (usize, &mut [f64])| -> Result<(), RasterError> {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(RasterError::DeadlineExceeded);
            }
            for (w, gx, gy, gz) in &profiles {
                let wx = w * gx[i];
                if wx == 0.0 {
                    continue;
                }
                for (j, row) in slab.chunks_mut(n).enumerate() {
                    let wxy = wx * gy[j];
                    for (value, gzk) in row.iter_mut().zip(gz) {
                        *value += wxy * gzk;
                    }
                }
            }
            Ok(())
        };

        let mut data = vec![0.0; self.geometry.voxel_count()];

        #[cfg(not(feature = "parallel"))]
        data.chunks_mut(n * n).enumerate().try_for_each(fill_slab)?;

        #[cfg(feature = "parallel")]
        data.par_chunks_mut(n * n).enumerate().try_for_each(fill_slab)?;

        Ok(data)
    }
}

/// Per-axis shift `(|max| - |min|) / 2` that roughly centers the atoms' extent
/// in the cube. Returns `None` for an empty atom set.
pub fn alignment_offset(atoms: &[Atom]) -> Option<Vector3<f64>> {
    let axis_offset = |axis: usize| -> Option<f64> {
        match atoms
            .iter()
            .map(|a| a.position[axis])
            .minmax_by(|a, b| a.total_cmp(b))
        {
            MinMaxResult::NoElements => None,
            MinMaxResult::OneElement(_) => Some(0.0),
            MinMaxResult::MinMax(min, max) => Some((max.abs() - min.abs()) / 2.0),
        }
    };
    Some(Vector3::new(axis_offset(0)?, axis_offset(1)?, axis_offset(2)?))
}

fn to_single_precision(data: Vec<f64>, channel: usize) -> Result<Vec<f32>, RasterError> {
    let converted: Vec<f32> = data.into_iter().map(|v| v as f32).collect();
    match converted.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(RasterError::NonFinite { channel, index }),
        None => Ok(converted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const TOLERANCE: f64 = 1e-5;
    const GAMMA: f64 = 0.36;
    const ALPHA: f64 = 6.0;

    fn rasterizer() -> GaussianRasterizer {
        GaussianRasterizer::new(GridGeometry::new(32, 12.0), GAMMA, ALPHA)
    }

    fn gaussian(weight: f64, voxel: [f64; 3], center: Point3<f64>) -> f64 {
        let d2 = (voxel[0] - center.x).powi(2)
            + (voxel[1] - center.y).powi(2)
            + (voxel[2] - center.z).powi(2);
        weight * (-d2 / (2.0 * GAMMA * GAMMA)).exp()
    }

    fn argmax(grid: &Array3<f32>) -> (usize, usize, usize) {
        grid.indexed_iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
            .unwrap()
    }

    fn molecule() -> Vec<Atom> {
        vec![
            Atom::new(Element::C, Point3::new(-0.0127, 1.0858, 0.0080)),
            Atom::new(Element::O, Point3::new(1.20, 1.10, -0.05)),
            Atom::new(Element::H, Point3::new(0.0022, -0.0060, 0.0020)),
            Atom::new(Element::H, Point3::new(-0.5408, 1.4475, -0.8766)),
            Atom::new(Element::N, Point3::new(-1.30, 0.60, 0.90)),
        ]
    }

    #[test]
    fn single_atom_peak_sits_at_nearest_voxel_and_follows_gaussian_law() {
        let raster = rasterizer();
        let position = Point3::new(1.0, -0.5, 0.25);
        let atoms = vec![Atom::new(Element::O, position)];

        let grid = match raster
            .rasterize_with(&atoms, ChannelMode::PerElement, Weighting::Constant(ALPHA), None)
            .unwrap()
        {
            PotentialGrid::PerElement(data) => data,
            other => panic!("expected per-element grid, got {:?}", other.shape()),
        };
        let oxygen = grid.index_axis(ndarray::Axis(0), Element::O.channel()).to_owned();

        let axis = raster.geometry().axis_coordinates();
        let nearest = |x: f64| {
            axis.iter()
                .enumerate()
                .min_by(|a, b| (a.1 - x).abs().total_cmp(&(b.1 - x).abs()))
                .map(|(i, _)| i)
                .unwrap()
        };
        let expected_peak = (nearest(position.x), nearest(position.y), nearest(position.z));
        assert_eq!(expected_peak, (18, 14, 16));
        assert_eq!(argmax(&oxygen), expected_peak);

        for ((i, j, k), value) in oxygen.indexed_iter() {
            let expected = gaussian(ALPHA, [axis[i], axis[j], axis[k]], position);
            assert!(
                (*value as f64 - expected).abs() < TOLERANCE,
                "voxel ({i}, {j}, {k}): {value} vs {expected}"
            );
        }

        let (_, j, k) = expected_peak;
        for i in 18..26 {
            assert!(oxygen[[i, j, k]] > oxygen[[i + 1, j, k]]);
        }
    }

    #[test]
    fn single_channel_mode_weights_by_atomic_number() {
        let raster = rasterizer();
        let position = Point3::new(0.0, 0.0, 0.0);
        let atoms = vec![Atom::new(Element::N, position)];

        let grid = match raster.rasterize(&atoms, ChannelMode::Single).unwrap() {
            PotentialGrid::Single(data) => data,
            other => panic!("expected single grid, got {:?}", other.shape()),
        };

        let axis = raster.geometry().axis_coordinates();
        let peak = argmax(&grid);
        let expected = gaussian(7.0, [axis[peak.0], axis[peak.1], axis[peak.2]], position);
        assert!((grid[peak] as f64 - expected).abs() < TOLERANCE);
        assert!(grid[peak] < 7.0 && grid[peak] > 4.5);
    }

    #[test]
    fn channels_sum_to_single_channel_grid_with_atomic_number_weights() {
        let raster = rasterizer();
        let atoms = molecule();

        let single = match raster.rasterize(&atoms, ChannelMode::Single).unwrap() {
            PotentialGrid::Single(data) => data,
            _ => unreachable!(),
        };
        let multi = match raster
            .rasterize_with(&atoms, ChannelMode::PerElement, Weighting::AtomicNumber, None)
            .unwrap()
        {
            PotentialGrid::PerElement(data) => data,
            _ => unreachable!(),
        };

        let summed = multi.sum_axis(ndarray::Axis(0));
        for (a, b) in summed.iter().zip(single.iter()) {
            assert!(((a - b).abs() as f64) < TOLERANCE * (1.0 + b.abs() as f64));
        }
    }

    #[test]
    fn absent_element_yields_exactly_zero_channel() {
        let grid = rasterizer().rasterize(&molecule(), ChannelMode::PerElement).unwrap();

        let fluorine = grid.channel(Element::F).unwrap();
        assert!(fluorine.iter().all(|&v| v == 0.0));
        assert!(grid.view().iter().all(|v| v.is_finite()));
        assert!(grid.channel(Element::C).unwrap().iter().any(|&v| v > 0.0));
    }

    #[test]
    fn alignment_offset_uses_absolute_extent_difference() {
        let atoms = vec![
            Atom::new(Element::C, Point3::new(1.0, -3.0, -1.0)),
            Atom::new(Element::H, Point3::new(3.0, -1.0, 1.0)),
        ];
        let offset = alignment_offset(&atoms).unwrap();

        assert!((offset.x - 1.0).abs() < 1e-12);
        assert!((offset.y - -1.0).abs() < 1e-12);
        assert!(offset.z.abs() < 1e-12);
        assert_eq!(alignment_offset(&[]), None);
    }

    #[test]
    fn offset_shifts_voxel_coordinates() {
        let raster = rasterizer();
        let atoms = vec![
            Atom::new(Element::H, Point3::new(1.0, 0.0, 0.0)),
            Atom::new(Element::H, Point3::new(3.0, 0.0, 0.0)),
        ];
        let grid = match raster.rasterize(&atoms, ChannelMode::Single).unwrap() {
            PotentialGrid::Single(data) => data,
            _ => unreachable!(),
        };

        let axis = raster.geometry().axis_coordinates();
        let (i, j, k) = (16, 15, 16);
        let voxel = [axis[i] + 1.0, axis[j], axis[k]];
        let expected = gaussian(1.0, voxel, atoms[0].position) + gaussian(1.0, voxel, atoms[1].position);
        assert!((grid[[i, j, k]] as f64 - expected).abs() < TOLERANCE);
    }

    #[test]
    fn element_group_scope_centers_each_channel_on_its_own_atoms() {
        let atoms = vec![
            Atom::new(Element::C, Point3::new(1.0, 0.0, 0.0)),
            Atom::new(Element::C, Point3::new(3.0, 0.0, 0.0)),
            Atom::new(Element::H, Point3::new(-3.0, 0.0, 0.0)),
        ];
        let shared = rasterizer().rasterize(&atoms, ChannelMode::PerElement).unwrap();
        let raster = rasterizer().with_offset_scope(OffsetScope::ElementGroup);
        assert_eq!(raster.offset_scope(), OffsetScope::ElementGroup);
        let grouped = raster.rasterize(&atoms, ChannelMode::PerElement).unwrap();

        assert_eq!(grouped.channel(Element::H), shared.channel(Element::H));
        assert_ne!(grouped.channel(Element::C), shared.channel(Element::C));

        let carbon = grouped.channel(Element::C).unwrap();
        let axis = raster.geometry().axis_coordinates();
        let (i, j, k) = (17, 16, 15);
        let voxel = [axis[i] + 1.0, axis[j], axis[k]];
        let expected = gaussian(ALPHA, voxel, atoms[0].position) + gaussian(ALPHA, voxel, atoms[1].position);
        assert!((carbon[[i, j, k]] as f64 - expected).abs() < TOLERANCE);

        let single = raster.rasterize(&atoms, ChannelMode::Single).unwrap();
        let single_shared = rasterizer().rasterize(&atoms, ChannelMode::Single).unwrap();
        assert_eq!(single, single_shared);
    }

    #[test]
    fn atoms_beyond_the_cube_still_contribute_without_clipping() {
        let raster = rasterizer();
        let atoms = vec![Atom::new(Element::C, Point3::new(7.0, 0.0, 0.0))];
        let grid = match raster.rasterize(&atoms, ChannelMode::Single).unwrap() {
            PotentialGrid::Single(data) => data,
            _ => unreachable!(),
        };

        let peak = argmax(&grid);
        assert_eq!(peak.0, 31);
        assert!(grid[peak] > 0.0);
        assert!(grid.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn empty_atom_set_is_rejected() {
        assert_eq!(
            rasterizer().rasterize(&[], ChannelMode::Single),
            Err(RasterError::EmptyAtomSet)
        );
    }

    #[test]
    fn non_finite_coordinates_are_surfaced() {
        let atoms = vec![Atom::new(Element::H, Point3::new(f64::NAN, 0.0, 0.0))];
        assert!(matches!(
            rasterizer().rasterize(&atoms, ChannelMode::Single),
            Err(RasterError::NonFinite { channel: 0, .. })
        ));
        assert!(matches!(
            rasterizer().rasterize(&atoms, ChannelMode::PerElement),
            Err(RasterError::NonFinite { channel: 0, .. })
        ));
    }

    #[test]
    fn overflowing_weight_is_reported_as_non_finite() {
        let atoms = vec![Atom::new(Element::F, Point3::origin())];
        let result = rasterizer().rasterize_with(
            &atoms,
            ChannelMode::PerElement,
            Weighting::Constant(1e300),
            None,
        );
        assert!(matches!(
            result,
            Err(RasterError::NonFinite { channel: 4, .. })
        ));
    }

    #[test]
    fn expired_deadline_aborts_rasterization() {
        let past = Instant::now() - Duration::from_secs(1);
        let result = rasterizer().rasterize_with(
            &molecule(),
            ChannelMode::Single,
            Weighting::AtomicNumber,
            Some(past),
        );
        assert_eq!(result, Err(RasterError::DeadlineExceeded));
    }
}
