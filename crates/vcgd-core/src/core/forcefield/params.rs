use super::potentials;
use crate::core::topology::registry::{AtomType, Topology};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

const BUILTIN_FORCEFIELD: &str = include_str!("../../../data/forcefield.toml");

/// Largest total energy the sentinel bound check tolerates, leaving plenty of
/// headroom below `f64::MAX` for differences and Boltzmann factors.
const SAFE_ENERGY_LIMIT: f64 = f64::MAX / 1e6;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PotentialFunction {
    SquareWell,
    ExponentialWell,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GlobalParams {
    pub cutoff: f64,
    pub big_energy: f64,
    pub potential_function: PotentialFunction,
    #[serde(default)]
    pub length: Option<f64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AtomParam {
    #[serde(rename = "type")]
    pub atom_type: AtomType,
    pub radius: f64,
    pub color: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InteractionParam {
    pub types: [AtomType; 2],
    pub well_depth: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawForceField {
    globals: GlobalParams,
    #[serde(default)]
    atom: Vec<AtomParam>,
    #[serde(default)]
    interaction: Vec<InteractionParam>,
}

/// Atom sizes, colors and pairwise well depths, plus the global cutoff and
/// overlap sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceField {
    globals: GlobalParams,
    radii: Vec<f64>,
    colors: Vec<String>,
    well_depths: Vec<f64>,
}

#[derive(Debug, Error)]
pub enum ParamLoadError {
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
    #[error("Invalid force field parameter: {0}")]
    Invalid(String),
}

impl ForceField {
    pub fn load(path: &Path) -> Result<Self, ParamLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ParamLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let raw: RawForceField = toml::from_str(&content).map_err(|e| ParamLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::new(raw.globals, raw.atom, raw.interaction)
    }

    /// The force field shipped with the crate.
    pub fn builtin() -> Result<Self, ParamLoadError> {
        let raw: RawForceField =
            toml::from_str(BUILTIN_FORCEFIELD).map_err(|e| ParamLoadError::Toml {
                path: "<builtin>".to_string(),
                source: e,
            })?;
        Self::new(raw.globals, raw.atom, raw.interaction)
    }

    pub fn new(
        globals: GlobalParams,
        mut atoms: Vec<AtomParam>,
        interactions: Vec<InteractionParam>,
    ) -> Result<Self, ParamLoadError> {
        if !(globals.big_energy.is_finite() && globals.big_energy > 0.0) {
            return Err(ParamLoadError::Invalid(format!(
                "big_energy must be positive and finite (got {})",
                globals.big_energy
            )));
        }
        if !(globals.cutoff.is_finite() && globals.cutoff > 0.0) {
            return Err(ParamLoadError::Invalid(format!(
                "cutoff must be positive and finite (got {})",
                globals.cutoff
            )));
        }
        if globals.potential_function == PotentialFunction::ExponentialWell {
            match globals.length {
                Some(l) if l.is_finite() && l > 0.0 => {}
                other => {
                    return Err(ParamLoadError::Invalid(format!(
                        "exponential-well requires a positive length (got {:?})",
                        other
                    )));
                }
            }
        }

        atoms.sort_by_key(|a| a.atom_type);
        for (expected, atom) in atoms.iter().enumerate() {
            if atom.atom_type != expected {
                return Err(ParamLoadError::Invalid(format!(
                    "atom types must be numbered 0..{} without gaps or duplicates (found {} at position {})",
                    atoms.len(),
                    atom.atom_type,
                    expected
                )));
            }
            if !(atom.radius.is_finite() && atom.radius >= 0.0) {
                return Err(ParamLoadError::Invalid(format!(
                    "radius of atom type {} must be non-negative and finite",
                    atom.atom_type
                )));
            }
        }

        let n_types = atoms.len();
        let max_contact = atoms.iter().map(|a| 2.0 * a.radius).fold(0.0, f64::max);
        if max_contact > globals.cutoff {
            return Err(ParamLoadError::Invalid(format!(
                "cutoff {} is shorter than the largest contact distance {}",
                globals.cutoff, max_contact
            )));
        }

        let mut well_depths = vec![0.0; n_types * n_types];
        for param in &interactions {
            let [a, b] = param.types;
            if a >= n_types || b >= n_types {
                return Err(ParamLoadError::Invalid(format!(
                    "interaction refers to undefined atom type pair ({}, {})",
                    a, b
                )));
            }
            if !param.well_depth.is_finite() {
                return Err(ParamLoadError::Invalid(format!(
                    "well depth for ({}, {}) must be finite",
                    a, b
                )));
            }
            well_depths[a * n_types + b] = param.well_depth;
            well_depths[b * n_types + a] = param.well_depth;
        }

        Ok(Self {
            globals,
            radii: atoms.iter().map(|a| a.radius).collect(),
            colors: atoms.into_iter().map(|a| a.color).collect(),
            well_depths,
        })
    }

    pub fn cutoff(&self) -> f64 {
        self.globals.cutoff
    }

    /// Finite stand-in for the energy of a steric overlap.
    pub fn big_energy(&self) -> f64 {
        self.globals.big_energy
    }

    pub fn potential_function(&self) -> PotentialFunction {
        self.globals.potential_function
    }

    pub fn n_atom_types(&self) -> usize {
        self.radii.len()
    }

    pub fn atom_radius(&self, atom_type: AtomType) -> f64 {
        self.radii.get(atom_type).copied().unwrap_or(0.0)
    }

    pub fn atom_color(&self, atom_type: AtomType) -> &str {
        self.colors.get(atom_type).map_or("0 0 0", String::as_str)
    }

    pub fn well_depth(&self, a: AtomType, b: AtomType) -> f64 {
        let n = self.radii.len();
        if a < n && b < n {
            self.well_depths[a * n + b]
        } else {
            0.0
        }
    }

    /// Interaction energy of two atoms `dist` apart. Exactly zero at or beyond
    /// the cutoff, the sentinel when the atoms overlap.
    #[inline]
    pub fn interaction_energy(&self, a: AtomType, b: AtomType, dist: f64) -> f64 {
        let contact = self.atom_radius(a) + self.atom_radius(b);
        let cutoff = self.globals.cutoff;
        let big = self.globals.big_energy;
        match self.globals.potential_function {
            PotentialFunction::SquareWell => {
                potentials::square_well(dist, contact, cutoff, self.well_depth(a, b), big)
            }
            PotentialFunction::ExponentialWell => potentials::exponential_well(
                dist,
                contact,
                cutoff,
                self.well_depth(a, b),
                self.globals.length.unwrap_or(1.0),
                big,
            ),
        }
    }

    /// Energy of an atom against the four cell walls, given its distances to
    /// the left, right, bottom and top walls.
    #[inline]
    pub fn wall_energy(&self, atom_type: AtomType, wall_distances: [f64; 4]) -> f64 {
        potentials::hard_wall(
            wall_distances,
            self.atom_radius(atom_type),
            self.globals.big_energy,
        )
    }

    /// Atom types used by `topology` that have no parameters here.
    pub fn missing_atom_types(&self, topology: &Topology) -> Vec<AtomType> {
        let mut missing: Vec<AtomType> = topology
            .atom_types()
            .filter(|&t| t >= self.n_atom_types())
            .collect();
        missing.sort_unstable();
        missing.dedup();
        missing
    }

    /// Whether the sentinel stays comfortably finite when every atom pair of
    /// every object pair, and every wall contact, overlaps at once.
    pub fn supports_population(&self, n_objects: usize, max_atoms: usize) -> bool {
        let n = n_objects.max(1) as f64;
        let atoms = max_atoms.max(1) as f64;
        let worst_case = self.globals.big_energy * 2.0 * n * (n * atoms * atoms + atoms);
        worst_case.is_finite() && worst_case < SAFE_ENERGY_LIMIT
    }
}
