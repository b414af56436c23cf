use super::config::{IntegratorConfig, RotationControl};
use super::error::EngineError;
use super::statistics::MoveStatistics;
use super::transaction::TrialMove;
use super::utils::sampling::{disc_displacement, metropolis_accept, rotation_increment};
use crate::core::forcefield::params::ForceField;
use crate::core::models::configuration::Configuration;
use crate::core::utils::geometry::{is_inside_cell, wrap_point};
use nalgebra::Point2;
use rand::Rng;
use std::f64::consts::TAU;
use tracing::{debug, instrument, trace, warn};

/// Result of a single Monte Carlo move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    Accepted { delta_e: f64 },
    Rejected { delta_e: f64 },
    /// The proposed centre left a non-periodic cell; no energy was evaluated.
    OutsideCell,
}

impl MoveOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, MoveOutcome::Accepted { .. })
    }
}

/// Metropolis Monte Carlo driver at constant number, area and temperature.
///
/// The integrator owns its random stream and carries the move amplitudes and
/// acceptance counts across calls to [`Integrator::run`].
#[derive(Debug)]
pub struct Integrator<R: Rng> {
    config: IntegratorConfig,
    rng: R,
    amplitude: f64,
    rotation_amplitude: f64,
    statistics: MoveStatistics,
    window: MoveStatistics,
}

impl<R: Rng> Integrator<R> {
    /// Creates an integrator.
    ///
    /// # Arguments
    ///
    /// * `config` - Amplitude feedback and rotation settings.
    /// * `rng` - The random stream every draw is taken from.
    /// * `amplitude` - Initial maximum translation per move.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParameter`] if the amplitudes or the
    /// feedback settings are not usable.
    pub fn new(config: IntegratorConfig, rng: R, amplitude: f64) -> Result<Self, EngineError> {
        if !(amplitude.is_finite() && amplitude > 0.0) {
            return Err(EngineError::InvalidParameter {
                name: "amplitude",
                reason: format!("must be positive and finite (got {})", amplitude),
            });
        }
        let rotation_amplitude = config.rotation.initial_angle();
        if !(rotation_amplitude.is_finite() && rotation_amplitude > 0.0) {
            return Err(EngineError::InvalidParameter {
                name: "rotation",
                reason: format!("must be positive and finite (got {})", rotation_amplitude),
            });
        }
        config
            .step_control
            .validate()
            .map_err(|reason| EngineError::InvalidParameter {
                name: "step_control",
                reason,
            })?;
        Ok(Self {
            config,
            rng,
            amplitude,
            rotation_amplitude,
            statistics: MoveStatistics::default(),
            window: MoveStatistics::default(),
        })
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn rotation_amplitude(&self) -> f64 {
        self.rotation_amplitude
    }

    pub fn statistics(&self) -> MoveStatistics {
        self.statistics
    }

    /// Attempts `n_steps` moves.
    ///
    /// `pressure` does not enter the acceptance rule; it is only recorded in
    /// the logs.
    ///
    /// # Return
    ///
    /// The acceptance counts of this call alone.
    #[instrument(level = "debug", skip_all, fields(beta = beta, pressure = pressure, n_steps = n_steps))]
    pub fn run(
        &mut self,
        configuration: &mut Configuration,
        forcefield: &ForceField,
        beta: f64,
        pressure: f64,
        n_steps: u64,
    ) -> MoveStatistics {
        let mut run_stats = MoveStatistics::default();
        if configuration.is_empty() {
            warn!("Configuration has no objects; skipping {} moves.", n_steps);
            return run_stats;
        }
        for _ in 0..n_steps {
            let outcome = self.step(configuration, forcefield, beta);
            run_stats.record(outcome.is_accepted());
        }
        debug!(
            accepted = run_stats.accepted,
            attempted = run_stats.attempted(),
            amplitude = self.amplitude,
            "Move batch finished."
        );
        run_stats
    }

    /// Attempts a single move on a uniformly chosen object.
    ///
    /// Draws are taken in a fixed order: object index, displacement radius,
    /// displacement direction, rotation, acceptance number. All five are
    /// drawn for every move, including moves that leave a non-periodic cell.
    ///
    /// The configuration must not be empty.
    pub fn step(
        &mut self,
        configuration: &mut Configuration,
        forcefield: &ForceField,
        beta: f64,
    ) -> MoveOutcome {
        let index = self.rng.gen_range(0..configuration.n_objects());
        let old_energy = configuration.energy(forcefield);

        let displacement = disc_displacement(self.amplitude, &mut self.rng);
        let rotation = rotation_increment(self.rotation_amplitude, &mut self.rng);
        let u = self.rng.r#gen::<f64>();

        let object = &configuration.objects()[index];
        let position = object.position + displacement;
        let orientation = object.orientation + rotation;
        let (width, height) = (configuration.width(), configuration.height());

        let outcome = if configuration.is_periodic() {
            let position = wrap_point(position, width, height);
            self.attempt(configuration, forcefield, beta, u, old_energy, index, position, orientation)
        } else if is_inside_cell(&position, width, height) {
            self.attempt(configuration, forcefield, beta, u, old_energy, index, position, orientation)
        } else {
            MoveOutcome::OutsideCell
        };
        trace!(index, ?outcome, "Move attempted.");

        self.statistics.record(outcome.is_accepted());
        self.window.record(outcome.is_accepted());
        if self.window.attempted() >= self.config.step_control.interval {
            self.adapt(configuration);
        }
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    fn attempt(
        &mut self,
        configuration: &mut Configuration,
        forcefield: &ForceField,
        beta: f64,
        u: f64,
        old_energy: f64,
        index: usize,
        position: Point2<f64>,
        orientation: f64,
    ) -> MoveOutcome {
        let range = configuration.interaction_range(forcefield);
        let mut trial = TrialMove::propose(configuration, index, position, orientation, range);
        let delta_e = trial.energy(forcefield) - old_energy;
        if metropolis_accept(delta_e, beta, u) {
            trial.commit();
            MoveOutcome::Accepted { delta_e }
        } else {
            trial.rollback();
            MoveOutcome::Rejected { delta_e }
        }
    }

    fn adapt(&mut self, configuration: &Configuration) {
        let control = self.config.step_control;
        let acceptance = self.window.acceptance_ratio();
        let ceiling = configuration.width().min(configuration.height()) / 2.0;
        let previous = self.amplitude;
        self.amplitude = control.adjust(self.amplitude, acceptance, ceiling);
        if let RotationControl::Adaptive(_) = self.config.rotation {
            self.rotation_amplitude = control.adjust(self.rotation_amplitude, acceptance, TAU);
        }
        trace!(
            acceptance,
            previous,
            amplitude = self.amplitude,
            rotation = self.rotation_amplitude,
            "Move amplitude adjusted."
        );
        self.window = MoveStatistics::default();
    }
}
