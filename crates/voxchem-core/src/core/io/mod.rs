//! Reading raw molecule records and persisting built datasets.
//!
//! [`traits::GeometryFile`] is the common interface for geometry parsers;
//! [`xyz::XyzFile`] implements it for the QM9 extended-XYZ layout.
//! [`storage`] writes a finished dataset as `.npy` grids plus a CSV manifest
//! and reads it back lazily.

pub mod storage;
pub mod traits;
pub mod xyz;
