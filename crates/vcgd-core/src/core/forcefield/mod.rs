//! # Force Field Module
//!
//! Parameters and functional forms for atom-atom and atom-wall interactions.
//!
//! ## Overview
//!
//! Every atom type has a hard radius and a drawing color. Every pair of atom
//! types has a well depth. Two global parameters complete the picture:
//!
//! - **cutoff** - atom pairs at or beyond this distance do not interact
//!   (hard cutoff, no smoothing)
//! - **big energy** - a large but finite value standing in for the energy of
//!   a steric overlap, so that energies and Boltzmann factors stay finite
//!
//! Between contact (sum of radii) and the cutoff the pair energy follows either
//! a square well or an exponentially decaying well.
//!
//! ## Key Components
//!
//! - [`params`] - The [`params::ForceField`] type and its TOML loader
//! - [`potentials`] - Pure functional forms used by the force field

pub mod params;
pub(crate) mod potentials;
