//! # Core Module
//!
//! Data structures and physics for coarse-grained rigid objects in two
//! dimensions.
//!
//! ## Overview
//!
//! Objects are rigid collections of atoms. Atoms interact pairwise through a
//! short-ranged well with a hard core, and with the cell walls when the cell
//! is not periodic. The core module knows how to describe, score, read and
//! draw such systems; it does not drive any sampling.
//!
//! ## Architecture
//!
//! - **Object Shapes** ([`topology`]) - Atom layouts of each object type
//! - **Energy Model** ([`forcefield`]) - Atom radii, well depths, cutoff and overlap sentinel
//! - **System State** ([`models`]) - Objects in a cell and the cached energy engine
//! - **File I/O** ([`io`]) - The configuration text format and Postscript snapshots
//! - **Geometry** ([`utils`]) - Minimum image, wrapping and rotation helpers

pub mod forcefield;
pub mod io;
pub mod models;
pub mod topology;
pub mod utils;
