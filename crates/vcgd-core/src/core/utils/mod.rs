//! Geometry helpers shared by the energy engine and the Monte Carlo driver.

pub mod geometry;
