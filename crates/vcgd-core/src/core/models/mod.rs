//! # Core Models Module
//!
//! The state of a simulation: rigid objects placed in a rectangular cell.
//!
//! ## Overview
//!
//! A [`configuration::Configuration`] owns an ordered list of
//! [`object::RigidObject`]s together with the cell dimensions and boundary
//! conditions. It evaluates the total interaction energy against a force
//! field and caches the result at two levels so that a single-object move
//! only recomputes the objects it can affect.
//!
//! ## Key Components
//!
//! - [`object`] - A rigid object with its per-object energy cache
//! - [`configuration`] - The cell, its objects and the energy engine
//!
//! ## Usage
//!
//! ```ignore
//! use vcgd::core::models::{configuration::Configuration, object::RigidObject};
//!
//! let mut config = Configuration::new(10.0, 10.0, false)?;
//! config.set_topology(Arc::new(Topology::builtin()?))?;
//! config.add_object(RigidObject::new(0, Point2::new(4.5, 5.0), 0.0))?;
//! config.add_object(RigidObject::new(0, Point2::new(5.5, 5.0), 0.0))?;
//! let energy = config.energy(&forcefield);
//! ```

pub mod configuration;
pub mod object;
