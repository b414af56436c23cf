//! Random draws used by the Monte Carlo driver.

pub mod sampling;
