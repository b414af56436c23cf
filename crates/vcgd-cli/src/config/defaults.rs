use std::f64::consts::TAU;

/// Values used when neither the command line nor the run settings file give one.
pub struct DefaultsConfig {
    pub periodic: bool,
    pub target_acceptance: f64,
    pub tolerance: f64,
    pub adjust_factor: f64,
    pub adjust_interval: u64,
    pub min_amplitude: f64,
    pub max_angle: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            periodic: true,
            target_acceptance: 0.5,
            tolerance: 0.1,
            adjust_factor: 1.1,
            adjust_interval: 100,
            min_amplitude: 1e-6,
            max_angle: TAU,
        }
    }
}
