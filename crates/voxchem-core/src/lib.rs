//! # VoxChem Core Library
//!
//! Converts QM9-style molecular geometry records into voxelized Gaussian
//! potential grids labeled with atomization energies, and serves them in
//! batches for training.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three layers from bottom to top:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`GeometryRecord`, `Dataset`),
//!   the XYZ parser, the reference energy table and the Gaussian rasterizer.
//!
//! - **[`engine`]: The Logic Core.** Validated configuration, error types, progress
//!   reporting and the batch feed that walks a dataset epoch by epoch.
//!
//! - **[`workflows`]: The Public API.** Complete procedures such as building a
//!   dataset from many record files on a pool of workers.

pub mod core;
pub mod engine;
pub mod workflows;
