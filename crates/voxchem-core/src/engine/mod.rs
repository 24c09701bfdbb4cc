//! # Engine Module
//!
//! The stateful layer between the stateless [`crate::core`] building blocks and
//! the [`crate::workflows`] entry points.
//!
//! - **Configuration** ([`config`]) - Rasterizer, build and feed settings with validated defaults
//! - **Error Handling** ([`error`]) - Build-level, record-level and feed errors
//! - **Progress Monitoring** ([`progress`]) - Callback-based build progress events
//! - **Batch Feeding** ([`feed`]) - Shuffled, epoch-based batches over a finished dataset

pub mod config;
pub mod error;
pub mod feed;
pub mod progress;
