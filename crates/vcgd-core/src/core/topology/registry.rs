use nalgebra::Vector2;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub type ObjectType = usize;
pub type AtomType = usize;

const BUILTIN_TOPOLOGY: &str = include_str!("../../../data/topology.toml");

/// An interaction site of an object type, positioned in the body frame
/// (object centre at the origin, orientation zero).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopologyAtom {
    pub atom_type: AtomType,
    pub offset: Vector2<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTopology {
    atoms: Vec<TopologyAtom>,
    extent: f64,
}

impl ObjectTopology {
    pub fn new(atoms: Vec<TopologyAtom>) -> Self {
        let extent = atoms
            .iter()
            .map(|atom| atom.offset.norm())
            .fold(0.0, f64::max);
        Self { atoms, extent }
    }

    pub fn atoms(&self) -> &[TopologyAtom] {
        &self.atoms
    }

    /// Distance from the object centre to its furthest atom.
    pub fn extent(&self) -> f64 {
        self.extent
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAtom {
    #[serde(rename = "type")]
    atom_type: AtomType,
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawObject {
    #[serde(rename = "type")]
    object_type: ObjectType,
    atoms: Vec<RawAtom>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTopology {
    #[serde(default)]
    object: Vec<RawObject>,
}

/// Static mapping from object type to the atoms it is built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    registry: HashMap<ObjectType, ObjectTopology>,
    max_extent: f64,
}

impl Topology {
    pub fn load(path: &Path) -> Result<Self, TopologyLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| TopologyLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            TopologyLoadError::Toml { source, .. } => TopologyLoadError::Toml {
                path: path.to_string_lossy().to_string(),
                source,
            },
            other => other,
        })
    }

    /// The topology shipped with the crate.
    pub fn builtin() -> Result<Self, TopologyLoadError> {
        Self::from_toml_str(BUILTIN_TOPOLOGY)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, TopologyLoadError> {
        let raw: RawTopology = toml::from_str(content).map_err(|e| TopologyLoadError::Toml {
            path: "<inline>".to_string(),
            source: e,
        })?;

        let mut topology = Self::default();
        for object in raw.object {
            let atoms = object
                .atoms
                .into_iter()
                .map(|a| TopologyAtom {
                    atom_type: a.atom_type,
                    offset: Vector2::new(a.x, a.y),
                })
                .collect();
            topology.insert(object.object_type, ObjectTopology::new(atoms))?;
        }
        Ok(topology)
    }

    pub fn insert(
        &mut self,
        object_type: ObjectType,
        object: ObjectTopology,
    ) -> Result<(), TopologyLoadError> {
        if self.registry.contains_key(&object_type) {
            return Err(TopologyLoadError::DuplicateObjectType(object_type));
        }
        if object
            .atoms()
            .iter()
            .any(|a| !a.offset.x.is_finite() || !a.offset.y.is_finite())
        {
            return Err(TopologyLoadError::NonFiniteOffset(object_type));
        }
        self.max_extent = self.max_extent.max(object.extent());
        self.registry.insert(object_type, object);
        Ok(())
    }

    pub fn get(&self, object_type: ObjectType) -> Option<&ObjectTopology> {
        self.registry.get(&object_type)
    }

    pub fn contains(&self, object_type: ObjectType) -> bool {
        self.registry.contains_key(&object_type)
    }

    /// Atoms of an object type; unknown types have none.
    pub fn atoms(&self, object_type: ObjectType) -> &[TopologyAtom] {
        self.get(object_type).map(|o| o.atoms()).unwrap_or(&[])
    }

    pub fn atom_count(&self, object_type: ObjectType) -> usize {
        self.atoms(object_type).len()
    }

    pub fn atom(&self, object_type: ObjectType, index: usize) -> Option<&TopologyAtom> {
        self.atoms(object_type).get(index)
    }

    pub fn extent(&self, object_type: ObjectType) -> f64 {
        self.get(object_type).map_or(0.0, |o| o.extent())
    }

    /// Largest extent over all object types.
    pub fn max_extent(&self) -> f64 {
        self.max_extent
    }

    pub fn max_atom_count(&self) -> usize {
        self.registry
            .values()
            .map(|o| o.atoms().len())
            .max()
            .unwrap_or(0)
    }

    pub fn atom_types(&self) -> impl Iterator<Item = AtomType> + '_ {
        self.registry
            .values()
            .flat_map(|o| o.atoms().iter().map(|a| a.atom_type))
    }
}

#[derive(Debug, Error)]
pub enum TopologyLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Object type {0} is defined more than once")]
    DuplicateObjectType(ObjectType),
    #[error("Object type {0} has a non-finite atom offset")]
    NonFiniteOffset(ObjectType),
}
