use thiserror::Error;

use crate::core::models::configuration::ModelError;
use crate::core::topology::registry::AtomType;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("No topology is attached to the configuration")]
    MissingTopology,

    #[error("Force field has no parameters for atom types {0:?}")]
    UncoveredAtomTypes(Vec<AtomType>),

    #[error(
        "Overlap energy {big_energy} is too large for {n_objects} objects of up to {max_atoms} atoms"
    )]
    UnsafeSentinel {
        big_energy: f64,
        n_objects: usize,
        max_atoms: usize,
    },

    #[error("Unable to remove initial overlaps in {attempts} steps")]
    RelaxationFailed { attempts: u64 },

    #[error("Configuration error: {source}")]
    Model {
        #[from]
        source: ModelError,
    },
}
