//! Isolated-atom reference energies and the atomization-energy label.
//!
//! The label of every sample is the atomization energy of its molecule: the
//! total 0 K reference energy minus the sum of the isolated-atom energies of
//! its constituents. All energies are in Hartree.

use crate::core::models::atom::{Atom, Element};
use crate::core::models::record::GeometryRecord;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Isolated hydrogen atom energy (Hartree).
pub const HYDROGEN_ENERGY: f64 = -0.5;
/// Isolated carbon atom energy (Hartree).
pub const CARBON_ENERGY: f64 = -37.8450;
/// Isolated nitrogen atom energy (Hartree).
pub const NITROGEN_ENERGY: f64 = -54.5892;
/// Isolated oxygen atom energy (Hartree).
pub const OXYGEN_ENERGY: f64 = -75.0673;
/// Isolated fluorine atom energy (Hartree).
pub const FLUORINE_ENERGY: f64 = -99.7339;

static DEFAULT_TABLE: ReferenceEnergyTable = ReferenceEnergyTable {
    energies: [
        HYDROGEN_ENERGY,
        CARBON_ENERGY,
        NITROGEN_ENERGY,
        OXYGEN_ENERGY,
        FLUORINE_ENERGY,
    ],
};

#[derive(Debug, Error)]
pub enum EnergyError {
    #[error("Cannot compute a per-atom energy for a record without atoms")]
    EmptyAtomSet,
    #[error("Energy table is missing an entry for element {0}")]
    MissingElement(Element),
    #[error("Energy table contains unsupported element '{0}'")]
    UnknownElement(String),
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Per-element isolated-atom energies, indexed by channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceEnergyTable {
    energies: [f64; Element::COUNT],
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EnergyTableFile {
    energies: HashMap<String, f64>,
}

impl Default for ReferenceEnergyTable {
    fn default() -> Self {
        DEFAULT_TABLE
    }
}

impl ReferenceEnergyTable {
    /// The built-in table shared by the whole process.
    pub fn standard() -> &'static ReferenceEnergyTable {
        &DEFAULT_TABLE
    }

    /// Loads an override table from a TOML file of the form
    /// `[energies]` followed by one `<symbol> = <hartree>` line per element.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed, names an unsupported
    /// element, or leaves any supported element without a value.
    pub fn load(path: &Path) -> Result<Self, EnergyError> {
        let content = std::fs::read_to_string(path).map_err(|e| EnergyError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            EnergyError::Toml { source, .. } => EnergyError::Toml {
                path: path.to_string_lossy().to_string(),
                source,
            },
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, EnergyError> {
        let file: EnergyTableFile = toml::from_str(content).map_err(|e| EnergyError::Toml {
            path: "<string>".to_string(),
            source: e,
        })?;

        let mut slots: [Option<f64>; Element::COUNT] = [None; Element::COUNT];
        for (symbol, energy) in file.energies {
            let element =
                Element::from_str(&symbol).map_err(|_| EnergyError::UnknownElement(symbol))?;
            slots[element.channel()] = Some(energy);
        }

        let mut energies = [0.0; Element::COUNT];
        for element in Element::ALL {
            energies[element.channel()] =
                slots[element.channel()].ok_or(EnergyError::MissingElement(element))?;
        }
        Ok(Self { energies })
    }

    pub fn energy_of(&self, element: Element) -> f64 {
        self.energies[element.channel()]
    }

    /// Sum of the isolated-atom energies of `atoms`.
    pub fn sum_individual_energies(&self, atoms: &[Atom]) -> f64 {
        atoms.iter().map(|a| self.energy_of(a.element)).sum()
    }

    /// Reference energy minus the summed isolated-atom energies.
    pub fn atomization_energy(&self, reference_energy: f64, atoms: &[Atom]) -> f64 {
        reference_energy - self.sum_individual_energies(atoms)
    }
}

/// Reference energy divided by the number of atoms.
pub fn per_atom_energy(reference_energy: f64, atom_count: usize) -> Result<f64, EnergyError> {
    if atom_count == 0 {
        return Err(EnergyError::EmptyAtomSet);
    }
    Ok(reference_energy / atom_count as f64)
}

/// The diagnostic energy scalars kept alongside every built sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyBreakdown {
    pub raw_energy: f64,
    pub per_atom_energy: f64,
    pub individual_energy_sum: f64,
    pub atomization_energy: f64,
    pub atom_count: usize,
}

impl EnergyBreakdown {
    pub fn compute(
        record: &GeometryRecord,
        table: &ReferenceEnergyTable,
    ) -> Result<Self, EnergyError> {
        let raw_energy = record.reference_energy();
        let per_atom_energy = per_atom_energy(raw_energy, record.atom_count())?;
        let individual_energy_sum = table.sum_individual_energies(record.atoms());
        Ok(Self {
            raw_energy,
            per_atom_energy,
            individual_energy_sum,
            atomization_energy: raw_energy - individual_energy_sum,
            atom_count: record.atom_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TOLERANCE: f64 = 1e-7;

    fn hco_atoms() -> Vec<Atom> {
        vec![
            Atom::new(Element::H, Point3::new(0.0, 0.0, 1.1)),
            Atom::new(Element::C, Point3::origin()),
            Atom::new(Element::O, Point3::new(1.2, 0.0, 0.0)),
        ]
    }

    #[test]
    fn atomization_energy_matches_hand_computed_value() {
        let table = ReferenceEnergyTable::default();
        let reference = -113.6;

        let expected = -113.6 - (-0.5 - 37.8450 - 75.0673);
        let actual = table.atomization_energy(reference, &hco_atoms());

        assert!((actual - expected).abs() < TOLERANCE);
        assert!((actual - (-0.1877)).abs() < TOLERANCE);
    }

    #[test]
    fn sum_of_empty_atom_list_is_zero() {
        assert_eq!(ReferenceEnergyTable::default().sum_individual_energies(&[]), 0.0);
    }

    #[test]
    fn per_atom_energy_rejects_zero_atoms() {
        assert!(matches!(
            per_atom_energy(-40.0, 0),
            Err(EnergyError::EmptyAtomSet)
        ));
        assert!((per_atom_energy(-40.0, 4).unwrap() - -10.0).abs() < TOLERANCE);
    }

    #[test]
    fn breakdown_collects_all_diagnostics() {
        let record = GeometryRecord::new(3, -113.6, hco_atoms());
        let breakdown = EnergyBreakdown::compute(&record, ReferenceEnergyTable::standard()).unwrap();

        assert_eq!(breakdown.atom_count, 3);
        assert!((breakdown.raw_energy - -113.6).abs() < TOLERANCE);
        assert!((breakdown.per_atom_energy - (-113.6 / 3.0)).abs() < TOLERANCE);
        assert!((breakdown.individual_energy_sum - -113.4123).abs() < TOLERANCE);
        assert!((breakdown.atomization_energy - -0.1877).abs() < TOLERANCE);
    }

    #[test]
    fn breakdown_of_empty_record_fails() {
        let record = GeometryRecord::new(1, -1.0, Vec::new());
        assert!(matches!(
            EnergyBreakdown::compute(&record, ReferenceEnergyTable::standard()),
            Err(EnergyError::EmptyAtomSet)
        ));
    }

    #[test]
    fn load_reads_complete_override_table() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[energies]\nH = -0.6\nC = -38.0\nN = -54.0\nO = -75.0\nF = -99.0"
        )
        .unwrap();

        let table = ReferenceEnergyTable::load(file.path()).unwrap();
        assert_eq!(table.energy_of(Element::H), -0.6);
        assert_eq!(table.energy_of(Element::F), -99.0);
    }

    #[test]
    fn load_rejects_incomplete_or_unknown_entries() {
        let missing = "[energies]\nH = -0.5\nC = -37.8\nN = -54.5\nO = -75.0";
        assert!(matches!(
            ReferenceEnergyTable::from_toml_str(missing),
            Err(EnergyError::MissingElement(Element::F))
        ));

        let unknown = "[energies]\nH = -0.5\nC = -37.8\nN = -54.5\nO = -75.0\nF = -99.7\nS = -397.0";
        assert!(matches!(
            ReferenceEnergyTable::from_toml_str(unknown),
            Err(EnergyError::UnknownElement(s)) if s == "S"
        ));
    }

    #[test]
    fn load_reports_missing_file_as_io_error() {
        let result = ReferenceEnergyTable::load(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(EnergyError::Io { .. })));
    }
}
