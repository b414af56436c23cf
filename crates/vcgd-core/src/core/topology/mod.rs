//! # Topology Module
//!
//! Describes how each object type is assembled from atoms.
//!
//! An object type is a rigid arrangement of typed atoms given as offsets from
//! the object centre at orientation zero. The atom types refer to entries of
//! the force field. Topologies are read from TOML files of the form:
//!
//! ```toml
//! [[object]]
//! type = 1
//! atoms = [
//!     { type = 0, x = -0.5, y = 0.0 },
//!     { type = 0, x = 0.5, y = 0.0 },
//! ]
//! ```
//!
//! ```ignore
//! use vcgd::core::topology::registry::Topology;
//!
//! let topology = Topology::load(Path::new("topology.toml"))?;
//! let dimer_atoms = topology.atoms(1);
//! ```

pub mod registry;
