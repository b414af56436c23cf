use super::object::{EnergyCache, RigidObject};
use crate::core::forcefield::params::ForceField;
use crate::core::topology::registry::{AtomType, ObjectType, Topology};
use crate::core::utils::geometry::{
    is_inside_cell, minimum_image, rotate_offset, wrap_point,
};
use itertools::Itertools;
use nalgebra::{Point2, Vector2};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Slack added to distance screens so that rounding never hides a pair that
/// is inside the cutoff.
const RANGE_MARGIN: f64 = 1e-9;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("Cell dimensions must be positive and finite (got {width} x {height})")]
    InvalidCell { width: f64, height: f64 },

    #[error("Object type {0} is not defined in the topology")]
    UnknownObjectType(ObjectType),

    #[error("Object {index} at ({x}, {y}) lies outside the cell")]
    OutsideCell { index: usize, x: f64, y: f64 },

    #[error("Object index {index} is out of range for {len} objects")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Expansion factor must be positive and finite (got {0})")]
    InvalidExpansion(f64),

    #[error("Object {0} has a non-finite position or orientation")]
    NonFinite(usize),
}

/// An atom placed relative to its object's centre, in the cell frame.
#[derive(Debug, Clone, Copy)]
struct PlacedAtom {
    atom_type: AtomType,
    offset: Vector2<f64>,
}

/// Cache state saved before a trial move so that it can be undone exactly.
#[derive(Debug, Clone)]
enum CacheBackup {
    /// Objects that went from clean to dirty, with their previous cache.
    Sparse(Vec<(usize, EnergyCache)>),
    /// Every object's cache, used when any cache was already stale.
    Full(Vec<EnergyCache>),
}

/// Everything needed to restore the configuration to its state before
/// [`Configuration::displace`].
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    index: usize,
    position: Point2<f64>,
    orientation: f64,
    moved_cache: EnergyCache,
    backup: CacheBackup,
    total: EnergyCache,
}

/// A population of rigid objects in a rectangular, optionally periodic cell.
///
/// The configuration owns its objects and caches energies at two levels: each
/// object keeps its own interaction energy with a dirty flag, and the
/// configuration keeps the total with a global dirty flag. Mutations mark the
/// affected objects dirty; [`Configuration::energy`] only recomputes what is
/// stale.
///
/// Objects are addressed by their insertion index, which stays stable for the
/// lifetime of the configuration.
#[derive(Debug, Clone)]
pub struct Configuration {
    width: f64,
    height: f64,
    periodic: bool,
    objects: Vec<RigidObject>,
    total: EnergyCache,
    topology: Option<Arc<Topology>>,
}

impl Configuration {
    /// Creates an empty configuration.
    ///
    /// # Arguments
    ///
    /// * `width` - The extent of the cell along x.
    /// * `height` - The extent of the cell along y.
    /// * `periodic` - Whether opposite edges of the cell are identified.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidCell`] unless both extents are positive and finite.
    pub fn new(width: f64, height: f64, periodic: bool) -> Result<Self, ModelError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ModelError::InvalidCell { width, height });
        }
        Ok(Self {
            width,
            height,
            periodic,
            objects: Vec::new(),
            total: EnergyCache::default(),
            topology: None,
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn is_periodic(&self) -> bool {
        self.periodic
    }

    /// Switches boundary conditions. Every cached energy becomes stale.
    pub fn set_periodic(&mut self, periodic: bool) {
        if self.periodic != periodic {
            self.periodic = periodic;
            self.invalidate_all();
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Number of objects per unit area.
    pub fn density(&self) -> f64 {
        self.objects.len() as f64 / self.area()
    }

    pub fn n_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[RigidObject] {
        &self.objects
    }

    pub fn object(&self, index: usize) -> Option<&RigidObject> {
        self.objects.get(index)
    }

    /// The distinct object types present.
    pub fn object_types(&self) -> BTreeSet<ObjectType> {
        self.objects.iter().map(|o| o.object_type).collect()
    }

    /// Whether the cached total must be recomputed.
    pub fn is_dirty(&self) -> bool {
        self.total.dirty
    }

    pub fn topology(&self) -> Option<&Arc<Topology>> {
        self.topology.as_ref()
    }

    /// Attaches a topology, releasing and returning any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownObjectType`] if an object present in the
    /// configuration has no entry in `topology`. The configuration is left
    /// unchanged in that case.
    pub fn set_topology(
        &mut self,
        topology: Arc<Topology>,
    ) -> Result<Option<Arc<Topology>>, ModelError> {
        if let Some(missing) = self
            .object_types()
            .into_iter()
            .find(|&t| !topology.contains(t))
        {
            return Err(ModelError::UnknownObjectType(missing));
        }
        let previous = self.topology.replace(topology);
        self.invalidate_all();
        Ok(previous)
    }

    /// Appends an object and returns its index.
    ///
    /// In a periodic cell the position is wrapped into the cell; otherwise it
    /// must already lie inside.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownObjectType`] if a topology is attached and
    /// does not define the object's type, [`ModelError::NonFinite`] for
    /// non-finite coordinates, and [`ModelError::OutsideCell`] for a position
    /// outside a non-periodic cell.
    pub fn add_object(&mut self, mut object: RigidObject) -> Result<usize, ModelError> {
        let index = self.objects.len();
        if let Some(topology) = &self.topology {
            if !topology.contains(object.object_type) {
                return Err(ModelError::UnknownObjectType(object.object_type));
            }
        }
        if !(object.position.x.is_finite()
            && object.position.y.is_finite()
            && object.orientation.is_finite())
        {
            return Err(ModelError::NonFinite(index));
        }
        object.position = self.place_in_cell(index, object.position)?;
        object.cache = EnergyCache::default();
        self.objects.push(object);
        self.total.dirty = true;
        Ok(index)
    }

    /// Checks that every object lies inside the cell with finite coordinates.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (index, object) in self.objects.iter().enumerate() {
            if !(object.position.x.is_finite()
                && object.position.y.is_finite()
                && object.orientation.is_finite())
            {
                return Err(ModelError::NonFinite(index));
            }
            if !is_inside_cell(&object.position, self.width, self.height) {
                return Err(ModelError::OutsideCell {
                    index,
                    x: object.position.x,
                    y: object.position.y,
                });
            }
        }
        Ok(())
    }

    /// Centre-to-centre distance beyond which two objects cannot interact:
    /// the cutoff plus twice the largest object extent.
    pub fn interaction_range(&self, forcefield: &ForceField) -> f64 {
        let max_extent = self.topology.as_ref().map_or(0.0, |t| t.max_extent());
        forcefield.cutoff() + 2.0 * max_extent + RANGE_MARGIN
    }

    /// Minimum-image separation vector from object `from` to object `to`.
    pub fn separation(&self, from: usize, to: usize) -> Vector2<f64> {
        let delta = self.objects[to].position - self.objects[from].position;
        minimum_image(delta, self.width, self.height, self.periodic)
    }

    /// Returns the total interaction energy, recomputing only stale objects.
    ///
    /// Each stale object's energy is its interaction with every other object
    /// (plus its wall energy in a non-periodic cell). The total is half the sum
    /// of all object energies, since every pair is seen from both sides; wall
    /// terms carry the same one-half weight.
    ///
    /// After this call every object is clean and the cached total is current.
    ///
    /// # Arguments
    ///
    /// * `forcefield` - The force field providing pair and wall energies.
    ///
    /// # Return
    ///
    /// The total energy of the configuration.
    pub fn energy(&mut self, forcefield: &ForceField) -> f64 {
        if !self.total.dirty {
            return self.total.energy;
        }

        let placed = self.placed_atoms();
        let stale: Vec<usize> = (0..self.objects.len())
            .filter(|&i| self.objects[i].cache.dirty)
            .collect();

        #[cfg(not(feature = "parallel"))]
        let energies: Vec<f64> = stale
            .iter()
            .map(|&i| self.object_energy(i, &placed, forcefield))
            .collect();
        #[cfg(feature = "parallel")]
        let energies: Vec<f64> = stale
            .par_iter()
            .map(|&i| self.object_energy(i, &placed, forcefield))
            .collect();

        for (&i, energy) in stale.iter().zip(energies) {
            self.objects[i].set_energy(energy);
        }

        let raw = self.raw_energy_sum();
        self.total = EnergyCache {
            energy: raw / 2.0,
            dirty: false,
        };
        trace!(
            recomputed = stale.len(),
            total = self.total.energy,
            "Configuration energy refreshed."
        );
        self.total.energy
    }

    /// Sum of the per-object cached energies, i.e. twice the total energy once
    /// the configuration is clean.
    pub fn raw_energy_sum(&self) -> f64 {
        self.objects.iter().map(|o| o.cache.energy).sum()
    }

    /// Computes the total energy from scratch, visiting each pair once and
    /// ignoring every cache. Agrees with [`Configuration::energy`] up to
    /// rounding.
    pub fn reference_energy(&self, forcefield: &ForceField) -> f64 {
        let placed = self.placed_atoms();
        let pairs: f64 = (0..self.objects.len())
            .tuple_combinations()
            .map(|(i, j)| {
                if self.within_reach(i, j, forcefield) {
                    self.pair_energy(&placed[i], &placed[j], self.separation(i, j), forcefield)
                } else {
                    0.0
                }
            })
            .sum();
        let walls: f64 = if self.periodic {
            0.0
        } else {
            (0..self.objects.len())
                .map(|i| self.wall_energy(i, &placed[i], forcefield))
                .sum()
        };
        pairs + walls / 2.0
    }

    /// Marks dirty every object whose centre lies strictly closer than
    /// `distance` to object `index`, using the minimum image when periodic.
    ///
    /// The reference object itself is not marked and the global flag is not
    /// touched; callers that moved the object are responsible for both.
    ///
    /// # Return
    ///
    /// The number of objects that went from clean to dirty.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::IndexOutOfRange`] for an invalid index.
    pub fn invalidate_within(&mut self, distance: f64, index: usize) -> Result<usize, ModelError> {
        self.check_index(index)?;
        let mut changed = Vec::new();
        self.invalidate_within_recording(distance, index, &mut changed);
        Ok(changed.len())
    }

    /// Moves object `index` to `position`, wrapping it into a periodic cell,
    /// and invalidates its neighbourhood before and after the move.
    pub fn move_object(
        &mut self,
        index: usize,
        position: Point2<f64>,
        range: f64,
    ) -> Result<(), ModelError> {
        self.check_index(index)?;
        let orientation = self.objects[index].orientation;
        self.relocate(index, position, orientation, range)
    }

    /// Sets the orientation of object `index` and invalidates its neighbourhood.
    pub fn rotate_object(
        &mut self,
        index: usize,
        orientation: f64,
        range: f64,
    ) -> Result<(), ModelError> {
        self.check_index(index)?;
        let position = self.objects[index].position;
        self.relocate(index, position, orientation, range)
    }

    /// Scales the cell and every object position by `factor`. Orientations are
    /// kept; every cached energy becomes stale.
    pub fn expand(&mut self, factor: f64) -> Result<(), ModelError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(ModelError::InvalidExpansion(factor));
        }
        self.width *= factor;
        self.height *= factor;
        for object in &mut self.objects {
            object.expand(factor);
        }
        self.total.dirty = true;
        Ok(())
    }

    /// Applies a trial move and returns what is needed to undo it.
    ///
    /// The position must already be inside the cell (wrapped when periodic).
    pub(crate) fn displace(
        &mut self,
        index: usize,
        position: Point2<f64>,
        orientation: f64,
        range: f64,
    ) -> Snapshot {
        let object = &self.objects[index];
        let mut snapshot = Snapshot {
            index,
            position: object.position,
            orientation: object.orientation,
            moved_cache: object.cache,
            backup: CacheBackup::Sparse(Vec::new()),
            total: self.total,
        };
        // Objects already dirty are skipped by the sparse record but may be
        // recomputed against the trial position.
        if self.total.dirty || self.objects.iter().any(|o| o.cache.dirty) {
            snapshot.backup =
                CacheBackup::Full(self.objects.iter().map(|o| o.cache).collect());
        }

        let mut changed = Vec::new();
        self.apply_move(index, position, orientation, range, &mut changed);
        if let CacheBackup::Sparse(saved) = &mut snapshot.backup {
            *saved = changed;
        }
        snapshot
    }

    /// Undoes a move applied by [`Configuration::displace`], restoring
    /// positions and caches exactly.
    pub(crate) fn restore(&mut self, snapshot: Snapshot) {
        let object = &mut self.objects[snapshot.index];
        object.position = snapshot.position;
        object.orientation = snapshot.orientation;
        object.cache = snapshot.moved_cache;
        match snapshot.backup {
            CacheBackup::Sparse(saved) => {
                for (i, cache) in saved {
                    self.objects[i].cache = cache;
                }
            }
            CacheBackup::Full(all) => {
                for (object, cache) in self.objects.iter_mut().zip(all) {
                    object.cache = cache;
                }
            }
        }
        self.total = snapshot.total;
    }

    fn relocate(
        &mut self,
        index: usize,
        position: Point2<f64>,
        orientation: f64,
        range: f64,
    ) -> Result<(), ModelError> {
        if !(position.x.is_finite() && position.y.is_finite() && orientation.is_finite()) {
            return Err(ModelError::NonFinite(index));
        }
        let position = self.place_in_cell(index, position)?;
        let mut changed = Vec::new();
        self.apply_move(index, position, orientation, range, &mut changed);
        Ok(())
    }

    fn apply_move(
        &mut self,
        index: usize,
        position: Point2<f64>,
        orientation: f64,
        range: f64,
        changed: &mut Vec<(usize, EnergyCache)>,
    ) {
        self.invalidate_within_recording(range, index, changed);
        let object = &mut self.objects[index];
        object.position = position;
        object.orientation = orientation;
        object.mark_dirty();
        self.invalidate_within_recording(range, index, changed);
        self.total.dirty = true;
    }

    fn invalidate_within_recording(
        &mut self,
        distance: f64,
        index: usize,
        changed: &mut Vec<(usize, EnergyCache)>,
    ) {
        let distance_sq = distance * distance;
        for j in 0..self.objects.len() {
            if j == index || self.objects[j].cache.dirty {
                continue;
            }
            if self.separation(index, j).norm_squared() < distance_sq {
                changed.push((j, self.objects[j].cache));
                self.objects[j].mark_dirty();
            }
        }
    }

    fn invalidate_all(&mut self) {
        for object in &mut self.objects {
            object.mark_dirty();
        }
        self.total.dirty = true;
    }

    fn check_index(&self, index: usize) -> Result<(), ModelError> {
        if index < self.objects.len() {
            Ok(())
        } else {
            Err(ModelError::IndexOutOfRange {
                index,
                len: self.objects.len(),
            })
        }
    }

    fn place_in_cell(&self, index: usize, position: Point2<f64>) -> Result<Point2<f64>, ModelError> {
        if self.periodic {
            Ok(wrap_point(position, self.width, self.height))
        } else if is_inside_cell(&position, self.width, self.height) {
            Ok(position)
        } else {
            Err(ModelError::OutsideCell {
                index,
                x: position.x,
                y: position.y,
            })
        }
    }

    fn placed_atoms(&self) -> Vec<Vec<PlacedAtom>> {
        self.objects
            .iter()
            .map(|object| match &self.topology {
                Some(topology) => topology
                    .atoms(object.object_type)
                    .iter()
                    .map(|atom| PlacedAtom {
                        atom_type: atom.atom_type,
                        offset: rotate_offset(&atom.offset, object.orientation),
                    })
                    .collect(),
                None => Vec::new(),
            })
            .collect()
    }

    fn extent(&self, index: usize) -> f64 {
        self.topology
            .as_ref()
            .map_or(0.0, |t| t.extent(self.objects[index].object_type))
    }

    /// Whether any atom pair of objects `i` and `j` can be inside the cutoff.
    fn within_reach(&self, i: usize, j: usize, forcefield: &ForceField) -> bool {
        let reach = forcefield.cutoff() + self.extent(i) + self.extent(j) + RANGE_MARGIN;
        self.separation(i, j).norm_squared() < reach * reach
    }

    fn object_energy(&self, i: usize, placed: &[Vec<PlacedAtom>], forcefield: &ForceField) -> f64 {
        let mut value = 0.0;
        for j in 0..self.objects.len() {
            if i == j || !self.within_reach(i, j, forcefield) {
                continue;
            }
            value += self.pair_energy(&placed[i], &placed[j], self.separation(i, j), forcefield);
        }
        if !self.periodic {
            value += self.wall_energy(i, &placed[i], forcefield);
        }
        value
    }

    /// Interaction of two objects whose centres are separated by `delta`
    /// (from the first to the second).
    fn pair_energy(
        &self,
        atoms_a: &[PlacedAtom],
        atoms_b: &[PlacedAtom],
        delta: Vector2<f64>,
        forcefield: &ForceField,
    ) -> f64 {
        let mut value = 0.0;
        for a in atoms_a {
            for b in atoms_b {
                let dist = (delta + b.offset - a.offset).norm();
                value += forcefield.interaction_energy(a.atom_type, b.atom_type, dist);
            }
        }
        value
    }

    fn wall_energy(&self, i: usize, atoms: &[PlacedAtom], forcefield: &ForceField) -> f64 {
        let centre = self.objects[i].position;
        atoms
            .iter()
            .map(|atom| {
                let p = centre + atom.offset;
                forcefield.wall_energy(
                    atom.atom_type,
                    [p.x, self.width - p.x, p.y, self.height - p.y],
                )
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::{AtomParam, GlobalParams, InteractionParam, PotentialFunction};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const TOLERANCE: f64 = 1e-9;

    fn disc_forcefield() -> ForceField {
        ForceField::new(
            GlobalParams {
                cutoff: 2.0,
                big_energy: 1.0e10,
                potential_function: PotentialFunction::SquareWell,
                length: None,
            },
            vec![AtomParam {
                atom_type: 0,
                radius: 0.5,
                color: "0 0 0".to_string(),
            }],
            vec![InteractionParam {
                types: [0, 0],
                well_depth: -1.0,
            }],
        )
        .unwrap()
    }

    fn disc_topology() -> Arc<Topology> {
        Arc::new(
            Topology::from_toml_str(
                r#"
                [[object]]
                type = 0
                atoms = [{ type = 0, x = 0.0, y = 0.0 }]

                [[object]]
                type = 1
                atoms = [{ type = 0, x = -0.3, y = 0.0 }, { type = 0, x = 0.3, y = 0.1 }]
                "#,
            )
            .unwrap(),
        )
    }

    fn config_with(width: f64, periodic: bool, objects: &[(usize, f64, f64, f64)]) -> Configuration {
        let mut config = Configuration::new(width, width, periodic).unwrap();
        config.set_topology(disc_topology()).unwrap();
        for &(t, x, y, theta) in objects {
            config
                .add_object(RigidObject::new(t, Point2::new(x, y), theta))
                .unwrap();
        }
        config
    }

    fn random_config(rng: &mut StdRng, n: usize, width: f64, periodic: bool) -> Configuration {
        let mut config = Configuration::new(width, width, periodic).unwrap();
        config.set_topology(disc_topology()).unwrap();
        for _ in 0..n {
            let object = RigidObject::new(
                rng.gen_range(0..2),
                Point2::new(rng.gen_range(0.0..width), rng.gen_range(0.0..width)),
                rng.gen_range(-10.0..10.0),
            );
            config.add_object(object).unwrap();
        }
        config
    }

    #[test]
    fn two_discs_at_contact_have_one_well_depth() {
        let ff = disc_forcefield();
        let mut config = config_with(10.0, false, &[(0, 4.5, 5.0, 0.0), (0, 5.5, 5.0, 0.0)]);
        assert!((config.energy(&ff) - -1.0).abs() < TOLERANCE);
    }

    #[test]
    fn two_discs_beyond_cutoff_do_not_interact() {
        let ff = disc_forcefield();
        let mut config = config_with(10.0, false, &[(0, 2.5, 5.0, 0.0), (0, 7.5, 5.0, 0.0)]);
        assert_eq!(config.energy(&ff), 0.0);
    }

    #[test]
    fn overlapping_discs_score_the_sentinel() {
        let ff = disc_forcefield();
        let mut config = config_with(10.0, true, &[(0, 5.0, 5.0, 0.0), (0, 5.2, 5.0, 0.0)]);
        assert!(config.energy(&ff) >= ff.big_energy());
        assert!(config.energy(&ff).is_finite());
    }

    #[test]
    fn wall_contact_scores_the_sentinel_only_without_periodicity() {
        let ff = disc_forcefield();
        let mut walled = config_with(10.0, false, &[(0, 0.2, 5.0, 0.0)]);
        assert!(walled.energy(&ff) >= ff.big_energy() / 2.0);
        let mut periodic = config_with(10.0, true, &[(0, 0.2, 5.0, 0.0)]);
        assert_eq!(periodic.energy(&ff), 0.0);
    }

    #[test]
    fn periodic_images_interact_across_the_boundary() {
        let ff = disc_forcefield();
        let mut config = config_with(10.0, true, &[(0, 0.4, 5.0, 0.0), (0, 9.4, 5.0, 0.0)]);
        let separation = config.separation(0, 1);
        assert!((separation.norm() - 1.0).abs() < TOLERANCE);
        assert!((config.energy(&ff) - -1.0).abs() < TOLERANCE);

        config.set_periodic(false);
        assert_eq!(config.energy(&ff), 0.0);
    }

    #[test]
    fn minimum_image_separation_of_opposite_edges() {
        let config = config_with(10.0, true, &[(0, 0.1, 3.0, 0.0), (0, 9.9, 3.0, 0.0)]);
        assert!((config.separation(0, 1).norm() - 0.2).abs() < TOLERANCE);
        assert!((config.separation(1, 0).norm() - 0.2).abs() < TOLERANCE);
        assert_eq!(config.object(1).unwrap().position, Point2::new(9.9, 3.0));
    }

    #[test]
    fn raw_sum_is_twice_the_total() {
        let ff = disc_forcefield();
        let mut rng = StdRng::seed_from_u64(7);
        let mut config = random_config(&mut rng, 40, 8.0, false);
        let total = config.energy(&ff);
        assert_eq!(config.raw_energy_sum(), 2.0 * total);
    }

    #[test]
    fn energy_matches_reference_for_random_configurations() {
        let ff = disc_forcefield();
        let mut rng = StdRng::seed_from_u64(11);
        for periodic in [true, false] {
            let mut config = random_config(&mut rng, 30, 9.0, periodic);
            let cached = config.energy(&ff);
            let reference = config.reference_energy(&ff);
            assert!((cached - reference).abs() <= 1e-9 * reference.abs().max(1.0));
        }
    }

    #[test]
    fn energy_clears_all_dirty_flags_and_is_cached() {
        let ff = disc_forcefield();
        let mut config = config_with(10.0, true, &[(0, 1.0, 1.0, 0.0), (1, 2.0, 1.0, 0.3)]);
        assert!(config.is_dirty());
        let first = config.energy(&ff);
        assert!(!config.is_dirty());
        assert!(config.objects().iter().all(|o| !o.is_dirty()));
        assert_eq!(config.energy(&ff), first);
    }

    #[test]
    fn cached_path_tracks_a_sequence_of_moves() {
        let ff = disc_forcefield();
        let mut rng = StdRng::seed_from_u64(3);
        let mut config = random_config(&mut rng, 25, 7.0, true);
        let range = config.interaction_range(&ff);
        config.energy(&ff);
        for _ in 0..200 {
            let index = rng.gen_range(0..config.n_objects());
            let target = Point2::new(rng.gen_range(-1.0..8.0), rng.gen_range(-1.0..8.0));
            config.move_object(index, target, range).unwrap();
            if rng.r#gen::<bool>() {
                config.rotate_object(index, rng.gen_range(-7.0..7.0), range).unwrap();
            }
            let cached = config.energy(&ff);
            let reference = config.reference_energy(&ff);
            assert!((cached - reference).abs() <= 1e-9 * reference.abs().max(1.0));
        }
    }

    #[test]
    fn invalidate_within_marks_every_close_object() {
        let ff = disc_forcefield();
        let mut rng = StdRng::seed_from_u64(19);
        for periodic in [true, false] {
            for _ in 0..20 {
                let mut config = random_config(&mut rng, 30, 6.0, periodic);
                config.energy(&ff);
                let index = rng.gen_range(0..config.n_objects());
                let distance = rng.gen_range(0.1..4.0);

                let marked = config.invalidate_within(distance, index).unwrap();

                let expected: Vec<usize> = (0..config.n_objects())
                    .filter(|&j| j != index)
                    .filter(|&j| {
                        let a = config.objects()[index].position;
                        let b = config.objects()[j].position;
                        let mut dx = (b.x - a.x).abs();
                        let mut dy = (b.y - a.y).abs();
                        if periodic {
                            dx = dx.min(6.0 - dx);
                            dy = dy.min(6.0 - dy);
                        }
                        (dx * dx + dy * dy).sqrt() < distance
                    })
                    .collect();
                for &j in &expected {
                    assert!(config.objects()[j].is_dirty(), "object {} was missed", j);
                }
                assert!(!config.objects()[index].is_dirty());
                assert_eq!(marked, expected.len());
                assert!(!config.is_dirty());
            }
        }
    }

    #[test]
    fn invalidate_within_rejects_bad_index() {
        let mut config = config_with(10.0, true, &[(0, 1.0, 1.0, 0.0)]);
        assert_eq!(
            config.invalidate_within(1.0, 4),
            Err(ModelError::IndexOutOfRange { index: 4, len: 1 })
        );
    }

    #[test]
    fn expand_scales_cell_and_positions() {
        let ff = disc_forcefield();
        let mut config = config_with(4.0, true, &[(0, 1.0, 2.0, 0.7), (0, 2.0, 2.0, 0.0)]);
        config.energy(&ff);
        config.expand(1.5).unwrap();
        assert_eq!(config.width(), 6.0);
        assert_eq!(config.height(), 6.0);
        assert_eq!(config.area(), 36.0);
        assert_eq!(config.object(0).unwrap().position, Point2::new(1.5, 3.0));
        assert_eq!(config.object(0).unwrap().orientation, 0.7);
        assert!(config.is_dirty());
        assert!(config.objects().iter().all(|o| o.is_dirty()));
        assert_eq!(config.expand(0.0), Err(ModelError::InvalidExpansion(0.0)));
    }

    #[test]
    fn displace_then_restore_is_exact() {
        let ff = disc_forcefield();
        let mut rng = StdRng::seed_from_u64(23);
        let mut config = random_config(&mut rng, 30, 7.0, true);
        let range = config.interaction_range(&ff);
        config.energy(&ff);
        let before = config.clone();

        let snapshot = config.displace(4, Point2::new(3.3, 3.3), 1.0, range);
        config.energy(&ff);
        config.restore(snapshot);

        assert_eq!(config.total, before.total);
        assert_eq!(config.objects(), before.objects());
    }

    #[test]
    fn restore_recovers_a_stale_configuration() {
        let ff = disc_forcefield();
        let mut rng = StdRng::seed_from_u64(29);
        let mut config = random_config(&mut rng, 10, 5.0, false);
        let range = config.interaction_range(&ff);
        let before = config.clone();

        let snapshot = config.displace(2, Point2::new(2.5, 2.5), 0.0, range);
        config.energy(&ff);
        config.restore(snapshot);

        assert_eq!(config.objects(), before.objects());
        assert!(config.is_dirty());
    }

    #[test]
    fn add_object_validates_type_and_position() {
        let mut config = Configuration::new(5.0, 5.0, false).unwrap();
        config.set_topology(disc_topology()).unwrap();
        assert_eq!(
            config.add_object(RigidObject::new(9, Point2::new(1.0, 1.0), 0.0)),
            Err(ModelError::UnknownObjectType(9))
        );
        assert!(matches!(
            config.add_object(RigidObject::new(0, Point2::new(6.0, 1.0), 0.0)),
            Err(ModelError::OutsideCell { .. })
        ));
        assert_eq!(
            config.add_object(RigidObject::new(0, Point2::new(1.0, 1.0), 0.0)),
            Ok(0)
        );
    }

    #[test]
    fn add_object_wraps_into_periodic_cell() {
        let mut config = Configuration::new(5.0, 5.0, true).unwrap();
        config
            .add_object(RigidObject::new(0, Point2::new(6.0, -1.0), 0.0))
            .unwrap();
        let p = config.object(0).unwrap().position;
        assert!((p.x - 1.0).abs() < TOLERANCE && (p.y - 4.0).abs() < TOLERANCE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn set_topology_returns_previous_and_checks_types() {
        let mut config = config_with(5.0, true, &[(1, 1.0, 1.0, 0.0)]);
        let only_discs = Arc::new(
            Topology::from_toml_str("[[object]]\ntype = 0\natoms = []").unwrap(),
        );
        assert_eq!(
            config.set_topology(only_discs),
            Err(ModelError::UnknownObjectType(1))
        );
        let previous = config.set_topology(disc_topology()).unwrap();
        assert!(previous.is_some());
    }

    #[test]
    fn object_types_and_density() {
        let config = config_with(
            4.0,
            true,
            &[(0, 1.0, 1.0, 0.0), (1, 2.0, 1.0, 0.0), (0, 3.0, 1.0, 0.0)],
        );
        assert_eq!(config.object_types().into_iter().collect::<Vec<_>>(), vec![0, 1]);
        assert!((config.density() - 3.0 / 16.0).abs() < TOLERANCE);
    }

    #[test]
    fn new_rejects_degenerate_cells() {
        assert!(Configuration::new(0.0, 1.0, true).is_err());
        assert!(Configuration::new(1.0, f64::NAN, true).is_err());
    }
}
