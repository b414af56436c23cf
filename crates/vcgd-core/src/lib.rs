//! # VCGD Core Library
//!
//! Monte Carlo simulation of very coarse grained rigid objects in a
//! two-dimensional cell.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture.
//!
//! - **[`core`]: The Foundation.** Object topologies, the force field, the
//!   [`Configuration`](core::models::configuration::Configuration) with its
//!   cached energy engine, and file I/O.
//!
//! - **[`engine`]: The Sampler.** The Metropolis
//!   [`Integrator`](engine::integrator::Integrator) with adaptive move
//!   amplitude, exact rollback of rejected moves, and progress reporting.
//!
//! - **[`workflows`]: The Public API.** Complete runs such as
//!   [`workflows::nvt::run`], which relaxes initial overlaps and then samples
//!   with periodic checkpoints.

pub mod core;
pub mod engine;
pub mod workflows;
