//! # Engine Module
//!
//! Metropolis Monte Carlo sampling of a [`Configuration`](crate::core::models::configuration::Configuration)
//! at constant number, area and temperature.
//!
//! ## Overview
//!
//! Each move picks one object uniformly, displaces it within a disc and
//! rotates it, then accepts or rejects the result with the Metropolis rule.
//! Rejected moves are undone exactly through a [`transaction::TrialMove`],
//! which also restores every energy cache the move touched. The translation
//! amplitude (and optionally the rotation amplitude) is tuned on the fly to
//! keep the acceptance ratio near a target.
//!
//! ## Architecture
//!
//! - **Settings** ([`config`]) - Amplitude feedback, rotation control and run parameters
//! - **Driver** ([`integrator`]) - The move loop and amplitude feedback
//! - **Bookkeeping** ([`statistics`]) - Acceptance counts
//! - **Progress Monitoring** ([`progress`]) - Events and checkpoints for front ends
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod config;
pub mod error;
pub mod integrator;
pub mod progress;
pub mod statistics;
pub mod transaction;
pub(crate) mod utils;
