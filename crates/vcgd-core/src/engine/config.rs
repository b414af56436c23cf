use std::f64::consts::TAU;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
}

/// Feedback rule that keeps the acceptance ratio near a target by scaling the
/// move amplitude.
///
/// Every `interval` moves the acceptance ratio of that window is compared
/// with `target ± tolerance`. Above the band the amplitude grows by `factor`,
/// below it shrinks by `factor`. The result is clamped to
/// `[min_amplitude, ceiling]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepControl {
    pub interval: u64,
    pub target: f64,
    pub tolerance: f64,
    pub factor: f64,
    pub min_amplitude: f64,
}

impl Default for StepControl {
    fn default() -> Self {
        Self {
            interval: 100,
            target: 0.5,
            tolerance: 0.1,
            factor: 1.1,
            min_amplitude: 1e-6,
        }
    }
}

impl StepControl {
    /// Returns the amplitude to use for the next window.
    ///
    /// # Arguments
    ///
    /// * `amplitude` - The amplitude used during the window.
    /// * `acceptance` - The fraction of moves accepted in the window.
    /// * `ceiling` - The largest amplitude allowed.
    pub fn adjust(&self, amplitude: f64, acceptance: f64, ceiling: f64) -> f64 {
        let adjusted = if acceptance > self.target + self.tolerance {
            amplitude * self.factor
        } else if acceptance < self.target - self.tolerance {
            amplitude / self.factor
        } else {
            amplitude
        };
        adjusted.min(ceiling).max(self.min_amplitude)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.interval == 0 {
            return Err("interval must be at least 1".into());
        }
        if !(self.target > 0.0 && self.target < 1.0) {
            return Err(format!("target must lie in (0, 1) (got {})", self.target));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(format!(
                "tolerance must be non-negative (got {})",
                self.tolerance
            ));
        }
        if !(self.factor.is_finite() && self.factor > 1.0) {
            return Err(format!("factor must exceed 1 (got {})", self.factor));
        }
        if !(self.min_amplitude.is_finite() && self.min_amplitude > 0.0) {
            return Err(format!(
                "min_amplitude must be positive (got {})",
                self.min_amplitude
            ));
        }
        Ok(())
    }
}

/// How the maximum rotation per move evolves during a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RotationControl {
    /// Rotations are drawn from `[-angle/2, angle/2)` for the whole run.
    Fixed(f64),
    /// Starts at the given angle and follows the translation feedback rule,
    /// clamped to at most a full turn.
    Adaptive(f64),
}

impl Default for RotationControl {
    fn default() -> Self {
        RotationControl::Fixed(TAU)
    }
}

impl RotationControl {
    pub fn initial_angle(&self) -> f64 {
        match *self {
            RotationControl::Fixed(angle) | RotationControl::Adaptive(angle) => angle,
        }
    }

    pub fn is_adaptive(&self) -> bool {
        matches!(self, RotationControl::Adaptive(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntegratorConfig {
    pub step_control: StepControl,
    pub rotation: RotationControl,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NvtConfig {
    /// Production moves to attempt.
    pub steps: u64,
    /// Production moves between checkpoints.
    pub report_interval: u64,
    /// Inverse temperature.
    pub beta: f64,
    /// Recorded in checkpoints only; the cell never changes size.
    pub pressure: f64,
    /// Seed of the random stream. Drawn from the OS when absent.
    pub seed: Option<u64>,
    pub integrator: IntegratorConfig,
}

#[derive(Default)]
pub struct NvtConfigBuilder {
    steps: Option<u64>,
    report_interval: Option<u64>,
    beta: Option<f64>,
    pressure: Option<f64>,
    seed: Option<u64>,
    integrator: Option<IntegratorConfig>,
}

impl NvtConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(mut self, steps: u64) -> Self {
        self.steps = Some(steps);
        self
    }
    pub fn report_interval(mut self, interval: u64) -> Self {
        self.report_interval = Some(interval);
        self
    }
    pub fn beta(mut self, beta: f64) -> Self {
        self.beta = Some(beta);
        self
    }
    pub fn pressure(mut self, pressure: f64) -> Self {
        self.pressure = Some(pressure);
        self
    }
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
    pub fn integrator(mut self, integrator: IntegratorConfig) -> Self {
        self.integrator = Some(integrator);
        self
    }

    pub fn build(self) -> Result<NvtConfig, ConfigError> {
        Ok(NvtConfig {
            steps: self.steps.ok_or(ConfigError::MissingParameter("steps"))?,
            report_interval: self
                .report_interval
                .ok_or(ConfigError::MissingParameter("report_interval"))?,
            beta: self.beta.ok_or(ConfigError::MissingParameter("beta"))?,
            pressure: self
                .pressure
                .ok_or(ConfigError::MissingParameter("pressure"))?,
            seed: self.seed,
            integrator: self.integrator.unwrap_or_default(),
        })
    }
}
