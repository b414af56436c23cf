use crate::core::forcefield::params::ForceField;
use crate::core::models::configuration::{Configuration, Snapshot};
use nalgebra::Point2;

/// A tentative single-object move.
///
/// The move is applied when the trial is created. It stays in place only if
/// [`TrialMove::commit`] is called; dropping the trial in any other way puts
/// back the object and every energy cache the move touched, exactly as they
/// were.
pub struct TrialMove<'a> {
    configuration: &'a mut Configuration,
    snapshot: Option<Snapshot>,
}

impl<'a> TrialMove<'a> {
    /// Moves object `index` to `position` with `orientation`, invalidating
    /// every object within `range` of its old and new positions.
    ///
    /// `position` must already lie inside the cell.
    pub fn propose(
        configuration: &'a mut Configuration,
        index: usize,
        position: Point2<f64>,
        orientation: f64,
        range: f64,
    ) -> Self {
        let snapshot = configuration.displace(index, position, orientation, range);
        Self {
            configuration,
            snapshot: Some(snapshot),
        }
    }

    /// Energy of the configuration with the move applied.
    pub fn energy(&mut self, forcefield: &ForceField) -> f64 {
        self.configuration.energy(forcefield)
    }

    pub fn commit(mut self) {
        self.snapshot = None;
    }

    pub fn rollback(self) {}
}

impl Drop for TrialMove<'_> {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.configuration.restore(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::object::RigidObject;
    use crate::core::topology::registry::Topology;
    use std::sync::Arc;

    fn dimer_pair() -> (Configuration, ForceField) {
        let forcefield = ForceField::builtin().unwrap();
        let mut config = Configuration::new(6.0, 6.0, true).unwrap();
        config
            .set_topology(Arc::new(Topology::builtin().unwrap()))
            .unwrap();
        for (t, x, y, theta) in [(1, 2.0, 3.0, 0.2), (2, 3.6, 3.0, 1.0), (0, 5.0, 5.0, 0.0)] {
            config
                .add_object(RigidObject::new(t, Point2::new(x, y), theta))
                .unwrap();
        }
        (config, forcefield)
    }

    #[test]
    fn rollback_restores_state_bit_for_bit() {
        let (mut config, forcefield) = dimer_pair();
        let range = config.interaction_range(&forcefield);
        let before_energy = config.energy(&forcefield);
        let before = config.clone();

        let mut trial = TrialMove::propose(&mut config, 0, Point2::new(4.5, 4.8), 2.5, range);
        let trial_energy = trial.energy(&forcefield);
        trial.rollback();

        assert_ne!(trial_energy, before_energy);
        assert_eq!(config.objects(), before.objects());
        assert!(!config.is_dirty());
        assert_eq!(config.energy(&forcefield).to_bits(), before_energy.to_bits());
    }

    #[test]
    fn commit_keeps_the_move() {
        let (mut config, forcefield) = dimer_pair();
        let range = config.interaction_range(&forcefield);
        config.energy(&forcefield);

        let mut trial = TrialMove::propose(&mut config, 2, Point2::new(1.0, 1.0), 0.5, range);
        let trial_energy = trial.energy(&forcefield);
        trial.commit();

        assert_eq!(config.object(2).unwrap().position, Point2::new(1.0, 1.0));
        assert_eq!(config.energy(&forcefield), trial_energy);
        let reference = config.reference_energy(&forcefield);
        assert!((trial_energy - reference).abs() < 1e-9);
    }

    #[test]
    fn rollback_after_external_invalidation_keeps_caches_consistent() {
        let forcefield = ForceField::builtin().unwrap();
        let mut config = Configuration::new(10.0, 10.0, true).unwrap();
        config
            .set_topology(Arc::new(Topology::builtin().unwrap()))
            .unwrap();
        for (x, y) in [(2.0, 2.0), (3.2, 2.0), (5.0, 5.0)] {
            config
                .add_object(RigidObject::new(0, Point2::new(x, y), 0.0))
                .unwrap();
        }
        let range = config.interaction_range(&forcefield);
        let initial = config.energy(&forcefield);
        assert!(initial < 0.0);

        assert_eq!(config.invalidate_within(range, 0).unwrap(), 1);
        assert!(!config.is_dirty());
        let before = config.clone();

        let mut trial = TrialMove::propose(&mut config, 0, Point2::new(7.0, 6.0), 0.0, range);
        trial.energy(&forcefield);
        trial.rollback();

        assert_eq!(config.objects(), before.objects());
        assert!(config.object(1).unwrap().is_dirty());
        assert_eq!(config.energy(&forcefield).to_bits(), initial.to_bits());

        config.move_object(2, Point2::new(5.0, 5.0), range).unwrap();
        let cached = config.energy(&forcefield);
        let reference = config.reference_energy(&forcefield);
        assert!((cached - reference).abs() < 1e-12);
        assert!((cached - initial).abs() < 1e-12);
    }

    #[test]
    fn dropping_an_uncommitted_trial_rolls_back() {
        let (mut config, forcefield) = dimer_pair();
        let range = config.interaction_range(&forcefield);
        config.energy(&forcefield);
        let before = config.clone();
        {
            let _trial = TrialMove::propose(&mut config, 1, Point2::new(0.5, 0.5), 0.0, range);
        }
        assert_eq!(config.objects(), before.objects());
    }
}
