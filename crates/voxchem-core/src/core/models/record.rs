use super::atom::{Atom, Element};
use nalgebra::Point3;

/// One parsed molecular geometry with its reference energy.
///
/// Records are produced by the geometry reader and are read-only afterwards;
/// the atom list always has the length declared by the record header.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRecord {
    id: u64,
    reference_energy: f64,
    atoms: Vec<Atom>,
}

impl GeometryRecord {
    /// Creates a record from already validated parts.
    ///
    /// # Arguments
    ///
    /// * `id` - The record identifier from the metadata line.
    /// * `reference_energy` - Total 0 K reference energy in Hartree.
    /// * `atoms` - The atoms in file order.
    pub fn new(id: u64, reference_energy: f64, atoms: Vec<Atom>) -> Self {
        Self {
            id,
            reference_energy,
            atoms,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Total 0 K reference energy in Hartree.
    pub fn reference_energy(&self) -> f64 {
        self.reference_energy
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Positions of all atoms of `element`, in file order.
    pub fn positions_of(&self, element: Element) -> Vec<Point3<f64>> {
        self.atoms
            .iter()
            .filter(|a| a.element == element)
            .map(|a| a.position)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_of_filters_by_element_in_order() {
        let record = GeometryRecord::new(
            7,
            -40.0,
            vec![
                Atom::new(Element::H, Point3::new(1.0, 0.0, 0.0)),
                Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)),
                Atom::new(Element::H, Point3::new(-1.0, 0.0, 0.0)),
            ],
        );

        assert_eq!(record.atom_count(), 3);
        assert_eq!(
            record.positions_of(Element::H),
            vec![Point3::new(1.0, 0.0, 0.0), Point3::new(-1.0, 0.0, 0.0)]
        );
        assert!(record.positions_of(Element::F).is_empty());
    }
}
