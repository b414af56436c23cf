use crate::core::forcefield::params::ForceField;
use crate::core::models::configuration::Configuration;
use crate::engine::config::NvtConfig;
use crate::engine::error::EngineError;
use crate::engine::integrator::Integrator;
use crate::engine::progress::{Checkpoint, CheckpointKind, Progress, ProgressReporter};
use crate::engine::statistics::MoveStatistics;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info, instrument, warn};

/// Moves per relaxation round, per object.
const RELAXATION_ROUND_PER_OBJECT: u64 = 2;
/// Relaxation moves allowed before giving up, per object.
const RELAXATION_LIMIT_PER_OBJECT: u64 = 2000;

#[derive(Debug, Clone, PartialEq)]
pub struct NvtResult {
    pub final_energy: f64,
    /// Production moves only.
    pub statistics: MoveStatistics,
    pub amplitude: f64,
    pub rotation_amplitude: f64,
    /// Relaxation moves spent removing initial overlaps.
    pub relaxation_steps: u64,
    /// The seed the random stream was started from.
    pub seed: u64,
}

/// Runs an NVT Monte Carlo simulation on `configuration` in place.
///
/// Overlaps present in the starting state are first relaxed away at the
/// requested temperature; the run fails if that takes more than 2000 moves per
/// object. Production moves then follow in chunks of `report_interval`, with a
/// [`Progress::Checkpoint`] after each chunk.
///
/// # Arguments
///
/// * `configuration` - The starting state, with a topology attached. Left in the final state.
/// * `forcefield` - Interaction parameters.
/// * `config` - Run length, temperature, seed and move settings.
/// * `reporter` - Receives progress events and checkpoints.
///
/// # Errors
///
/// Returns [`EngineError`] for invalid parameters, a force field that does not
/// cover the topology, a population too large for the overlap energy, or a
/// failed relaxation.
#[instrument(skip_all, name = "nvt_workflow")]
pub fn run(
    configuration: &mut Configuration,
    forcefield: &ForceField,
    config: &NvtConfig,
    reporter: &ProgressReporter,
) -> Result<NvtResult, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    validate(configuration, forcefield, config)?;

    let seed = config.seed.unwrap_or_else(|| {
        let seed = rand::rngs::OsRng.next_u64();
        info!(seed, "No seed given; drawn one from the operating system.");
        seed
    });
    let mut rng = StdRng::seed_from_u64(seed);

    let energy = configuration.energy(forcefield);
    info!(
        n_objects = configuration.n_objects(),
        area = configuration.area(),
        energy,
        "Configuration loaded."
    );
    reporter.report(Progress::Checkpoint(checkpoint(
        CheckpointKind::Loaded,
        configuration,
        forcefield,
        config,
        0,
        MoveStatistics::default(),
        0.0,
    )));
    reporter.report(Progress::PhaseFinish);

    let initial_amplitude = configuration.width().min(configuration.height()) / 2.0;
    let (amplitude, relaxation_steps) =
        relax(configuration, forcefield, config, &mut rng, initial_amplitude, reporter)?;

    reporter.report(Progress::PhaseStart {
        name: "Production",
    });
    reporter.report(Progress::TaskStart {
        total_steps: config.steps,
    });
    let mut integrator = Integrator::new(config.integrator, &mut rng, amplitude)?;
    let mut done = 0u64;
    while done < config.steps {
        let chunk = config.report_interval.min(config.steps - done);
        integrator.run(configuration, forcefield, config.beta, config.pressure, chunk);
        done += chunk;
        reporter.report(Progress::TaskAdvance { steps: chunk });
        reporter.report(Progress::Checkpoint(checkpoint(
            CheckpointKind::Production,
            configuration,
            forcefield,
            config,
            done,
            integrator.statistics(),
            integrator.amplitude(),
        )));
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let statistics = integrator.statistics();
    let result = NvtResult {
        final_energy: configuration.energy(forcefield),
        statistics,
        amplitude: integrator.amplitude(),
        rotation_amplitude: integrator.rotation_amplitude(),
        relaxation_steps,
        seed,
    };
    info!(
        energy = result.final_energy,
        accepted = statistics.accepted,
        attempted = statistics.attempted(),
        "NVT run complete."
    );
    Ok(result)
}

fn validate(
    configuration: &Configuration,
    forcefield: &ForceField,
    config: &NvtConfig,
) -> Result<(), EngineError> {
    if !(config.beta.is_finite() && config.beta >= 0.0) {
        return Err(EngineError::InvalidParameter {
            name: "beta",
            reason: format!("must be finite and non-negative (got {})", config.beta),
        });
    }
    if !config.pressure.is_finite() {
        return Err(EngineError::InvalidParameter {
            name: "pressure",
            reason: format!("must be finite (got {})", config.pressure),
        });
    }
    if config.steps == 0 {
        return Err(EngineError::InvalidParameter {
            name: "steps",
            reason: "must be at least 1".into(),
        });
    }
    if config.report_interval == 0 {
        return Err(EngineError::InvalidParameter {
            name: "report_interval",
            reason: "must be at least 1".into(),
        });
    }

    let topology = configuration
        .topology()
        .ok_or(EngineError::MissingTopology)?;
    let missing = forcefield.missing_atom_types(topology);
    if !missing.is_empty() {
        return Err(EngineError::UncoveredAtomTypes(missing));
    }
    let max_atoms = topology.max_atom_count();
    if !forcefield.supports_population(configuration.n_objects(), max_atoms) {
        return Err(EngineError::UnsafeSentinel {
            big_energy: forcefield.big_energy(),
            n_objects: configuration.n_objects(),
            max_atoms,
        });
    }
    configuration.validate()?;
    debug!("Run parameters validated.");
    Ok(())
}

/// Runs rounds of moves until the energy drops to the overlap sentinel or below.
///
/// Returns the amplitude reached and the number of moves spent.
fn relax(
    configuration: &mut Configuration,
    forcefield: &ForceField,
    config: &NvtConfig,
    rng: &mut StdRng,
    amplitude: f64,
    reporter: &ProgressReporter,
) -> Result<(f64, u64), EngineError> {
    if configuration.energy(forcefield) <= forcefield.big_energy() {
        return Ok((amplitude, 0));
    }

    reporter.report(Progress::PhaseStart {
        name: "Relaxation",
    });
    let n = configuration.n_objects() as u64;
    let round = RELAXATION_ROUND_PER_OBJECT * n;
    let limit = RELAXATION_LIMIT_PER_OBJECT * n;
    let mut integrator = Integrator::new(config.integrator, &mut *rng, amplitude)?;
    let mut attempts = 0u64;

    while configuration.energy(forcefield) > forcefield.big_energy() {
        if attempts > limit {
            warn!(attempts, "Overlaps persist; giving up.");
            return Err(EngineError::RelaxationFailed { attempts });
        }
        integrator.run(configuration, forcefield, config.beta, config.pressure, round);
        attempts += round;
        reporter.report(Progress::Message(format!(
            "Relaxing overlaps ({} moves)",
            attempts
        )));
    }

    let amplitude = integrator.amplitude();
    info!(
        attempts,
        energy = configuration.energy(forcefield),
        "Initial overlaps removed."
    );
    reporter.report(Progress::Checkpoint(checkpoint(
        CheckpointKind::Relaxed,
        configuration,
        forcefield,
        config,
        0,
        integrator.statistics(),
        amplitude,
    )));
    reporter.report(Progress::PhaseFinish);
    Ok((amplitude, attempts))
}

fn checkpoint(
    kind: CheckpointKind,
    configuration: &mut Configuration,
    forcefield: &ForceField,
    config: &NvtConfig,
    steps: u64,
    statistics: MoveStatistics,
    amplitude: f64,
) -> Checkpoint {
    Checkpoint {
        kind,
        steps,
        n_objects: configuration.n_objects(),
        pressure: config.pressure,
        beta: config.beta,
        area: configuration.area(),
        density: configuration.density(),
        energy: configuration.energy(forcefield),
        accepted: statistics.accepted,
        attempted: statistics.attempted(),
        amplitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::object::RigidObject;
    use crate::core::topology::registry::Topology;
    use crate::engine::config::NvtConfigBuilder;
    use nalgebra::Point2;
    use std::sync::{Arc, Mutex};

    fn grid(n_side: usize, spacing: f64) -> Configuration {
        let width = n_side as f64 * spacing;
        let mut config = Configuration::new(width, width, true).unwrap();
        config
            .set_topology(Arc::new(Topology::builtin().unwrap()))
            .unwrap();
        for i in 0..n_side {
            for j in 0..n_side {
                let position = Point2::new((i as f64 + 0.5) * spacing, (j as f64 + 0.5) * spacing);
                config
                    .add_object(RigidObject::new(0, position, 0.0))
                    .unwrap();
            }
        }
        config
    }

    fn settings(steps: u64, interval: u64, seed: u64) -> NvtConfig {
        NvtConfigBuilder::new()
            .steps(steps)
            .report_interval(interval)
            .beta(1.0)
            .pressure(0.0)
            .seed(Some(seed))
            .build()
            .unwrap()
    }

    fn collect_checkpoints(
        configuration: &mut Configuration,
        config: &NvtConfig,
    ) -> (Result<NvtResult, EngineError>, Vec<Checkpoint>) {
        let forcefield = ForceField::builtin().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            if let Progress::Checkpoint(c) = event {
                sink.lock().unwrap().push(c);
            }
        }));
        let result = run(configuration, &forcefield, config, &reporter);
        let checkpoints = seen.lock().unwrap().clone();
        (result, checkpoints)
    }

    #[test]
    fn production_reports_every_chunk() {
        let mut configuration = grid(4, 2.0);
        let (result, checkpoints) = collect_checkpoints(&mut configuration, &settings(250, 100, 1));
        let result = result.unwrap();

        let production: Vec<&Checkpoint> = checkpoints
            .iter()
            .filter(|c| c.kind == CheckpointKind::Production)
            .collect();
        assert_eq!(checkpoints[0].kind, CheckpointKind::Loaded);
        assert_eq!(
            production.iter().map(|c| c.steps).collect::<Vec<_>>(),
            vec![100, 200, 250]
        );
        assert_eq!(production[2].attempted, 250);
        assert_eq!(result.statistics.attempted(), 250);
        assert_eq!(result.relaxation_steps, 0);
        assert_eq!(result.seed, 1);
        assert!((production[2].energy - result.final_energy).abs() < 1e-12);
    }

    #[test]
    fn same_seed_reproduces_the_run() {
        let mut a = grid(4, 2.0);
        let mut b = grid(4, 2.0);
        let (ra, _) = collect_checkpoints(&mut a, &settings(300, 300, 77));
        let (rb, _) = collect_checkpoints(&mut b, &settings(300, 300, 77));
        assert_eq!(ra.unwrap(), rb.unwrap());
        assert_eq!(a.objects(), b.objects());
    }

    #[test]
    fn overlapping_start_is_relaxed_first() {
        let mut configuration = grid(3, 3.0);
        configuration
            .move_object(1, Point2::new(1.7, 1.5), 10.0)
            .unwrap();
        configuration
            .move_object(2, Point2::new(1.5, 1.8), 10.0)
            .unwrap();
        let (result, checkpoints) = collect_checkpoints(&mut configuration, &settings(50, 50, 3));
        let result = result.unwrap();
        assert!(result.relaxation_steps > 0);
        assert!(checkpoints.iter().any(|c| c.kind == CheckpointKind::Relaxed));
        assert!(result.final_energy <= ForceField::builtin().unwrap().big_energy());
    }

    #[test]
    fn impossible_packing_fails_relaxation() {
        let mut configuration = Configuration::new(1.0, 1.0, true).unwrap();
        configuration
            .set_topology(Arc::new(Topology::builtin().unwrap()))
            .unwrap();
        for i in 0..4 {
            configuration
                .add_object(RigidObject::new(0, Point2::new(0.2 * i as f64, 0.5), 0.0))
                .unwrap();
        }
        let (result, _) = collect_checkpoints(&mut configuration, &settings(10, 10, 5));
        match result {
            Err(EngineError::RelaxationFailed { attempts }) => assert!(attempts > 2000 * 4),
            other => panic!("expected relaxation failure, got {:?}", other),
        }
    }

    #[test]
    fn rejects_invalid_parameters() {
        let mut configuration = grid(2, 2.0);
        let mut config = settings(10, 10, 0);
        config.beta = -1.0;
        let (result, _) = collect_checkpoints(&mut configuration, &config);
        assert!(matches!(
            result,
            Err(EngineError::InvalidParameter { name: "beta", .. })
        ));

        let mut config = settings(10, 10, 0);
        config.steps = 0;
        let (result, _) = collect_checkpoints(&mut configuration, &config);
        assert!(matches!(
            result,
            Err(EngineError::InvalidParameter { name: "steps", .. })
        ));
    }

    #[test]
    fn requires_a_topology() {
        let mut configuration = Configuration::new(4.0, 4.0, true).unwrap();
        configuration
            .add_object(RigidObject::new(0, Point2::new(1.0, 1.0), 0.0))
            .unwrap();
        let (result, _) = collect_checkpoints(&mut configuration, &settings(10, 10, 0));
        assert!(matches!(result, Err(EngineError::MissingTopology)));
    }

    #[test]
    fn rejects_uncovered_atom_types() {
        let mut configuration = Configuration::new(4.0, 4.0, true).unwrap();
        let topology = Topology::from_toml_str(
            "[[object]]\ntype = 0\natoms = [{ type = 7, x = 0.0, y = 0.0 }]",
        )
        .unwrap();
        configuration.set_topology(Arc::new(topology)).unwrap();
        let (result, _) = collect_checkpoints(&mut configuration, &settings(10, 10, 0));
        match result {
            Err(EngineError::UncoveredAtomTypes(types)) => assert_eq!(types, vec![7]),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
