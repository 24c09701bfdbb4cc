//! # Core Models Module
//!
//! Plain data types describing a parsed molecule: the supported [`atom::Element`]s,
//! individual [`atom::Atom`]s with Cartesian coordinates, and the
//! [`record::GeometryRecord`] that ties an atom list to its identifier and
//! reference energy, and the [`dataset::Dataset`] of rasterized samples.
//!
//! Records are immutable after construction; the reader in
//! [`crate::core::io`] is their only producer. Datasets are filled through a
//! [`dataset::DatasetBuilder`] and frozen before anyone reads them.

pub mod atom;
pub mod dataset;
pub mod record;
