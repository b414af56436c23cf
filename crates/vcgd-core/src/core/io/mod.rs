//! Reading and writing configurations.
//!
//! This module provides the plain-text configuration format used to exchange
//! states between runs, behind the [`traits::ConfigurationFile`] interface,
//! and an Encapsulated Postscript renderer for visual snapshots.

pub mod config_file;
pub mod postscript;
pub mod traits;
