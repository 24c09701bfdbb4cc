//! # Workflows Module
//!
//! Top-level entry points that tie the [`crate::engine`] and [`crate::core`]
//! layers together.
//!
//! - **Dataset Build** ([`build`]) - Parses, labels and rasterizes many geometry
//!   records on a worker pool, accounting for every record that had to be skipped.

pub mod build;
