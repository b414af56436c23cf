//! # Workflows Module
//!
//! Complete simulation procedures built on the core and engine layers.
//!
//! ## Overview
//!
//! A workflow validates its inputs, drives the engine and reports progress
//! through a [`ProgressReporter`](crate::engine::progress::ProgressReporter),
//! leaving the configuration in its final state.
//!
//! - **NVT Workflow** ([`nvt`]) - Overlap relaxation followed by production
//!   sampling at constant number, area and temperature, with periodic
//!   checkpoints.

pub mod nvt;
