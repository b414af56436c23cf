use crate::core::topology::registry::ObjectType;
use nalgebra::Point2;

/// Cached energy of a single object.
///
/// The energy value is only meaningful while `dirty` is `false`. Newly created
/// objects start dirty so that their first energy is always computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyCache {
    /// Sum of the object's interactions with every other object, plus its wall
    /// energy when the cell is not periodic.
    pub energy: f64,
    /// Whether `energy` must be recomputed before use.
    pub dirty: bool,
}

impl Default for EnergyCache {
    fn default() -> Self {
        Self {
            energy: 0.0,
            dirty: true,
        }
    }
}

/// A positioned and oriented instance of an object type.
///
/// The atoms of the object are given by the topology entry for `object_type`,
/// rotated by `orientation` and translated to `position`.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidObject {
    /// Index into the topology and force field tables.
    pub object_type: ObjectType,
    /// Centre of the object in cell coordinates.
    pub position: Point2<f64>,
    /// Orientation in radians. Not normalised to any range.
    pub orientation: f64,
    pub(crate) cache: EnergyCache,
}

impl RigidObject {
    /// Creates a new object whose energy has not been evaluated yet.
    ///
    /// # Arguments
    ///
    /// * `object_type` - The topology entry describing the object's atoms.
    /// * `position` - The centre of the object in cell coordinates.
    /// * `orientation` - The rotation of the object in radians.
    pub fn new(object_type: ObjectType, position: Point2<f64>, orientation: f64) -> Self {
        Self {
            object_type,
            position,
            orientation,
            cache: EnergyCache::default(),
        }
    }

    /// Returns the cached energy if it is up to date.
    pub fn cached_energy(&self) -> Option<f64> {
        (!self.cache.dirty).then_some(self.cache.energy)
    }

    pub fn is_dirty(&self) -> bool {
        self.cache.dirty
    }

    pub fn cache(&self) -> EnergyCache {
        self.cache
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.cache.dirty = true;
    }

    pub(crate) fn set_energy(&mut self, energy: f64) {
        self.cache = EnergyCache {
            energy,
            dirty: false,
        };
    }

    /// Scales the position about the cell origin.
    pub(crate) fn expand(&mut self, factor: f64) {
        self.position = Point2::new(self.position.x * factor, self.position.y * factor);
        self.cache.dirty = true;
    }
}
