//! # Core Module
//!
//! Stateless building blocks for turning molecule records into training samples.
//!
//! - **Molecular Representation** ([`models`]) - Elements, atoms, geometry records and datasets
//! - **Energy Labels** ([`energy`]) - Isolated-atom reference energies and atomization energies
//! - **Voxelization** ([`grid`]) - Grid geometry and the Gaussian rasterizer
//! - **File I/O** ([`io`]) - The QM9 XYZ parser and on-disk dataset storage
//!
//! Nothing in this module keeps state between calls; every function can be run
//! from any worker thread.

pub mod energy;
pub mod grid;
pub mod io;
pub mod models;
