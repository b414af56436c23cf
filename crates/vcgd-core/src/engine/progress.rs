/// Which point of a run a [`Checkpoint`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointKind {
    /// The configuration as loaded, before any move.
    Loaded,
    /// After the relaxation rounds that removed initial overlaps.
    Relaxed,
    /// After a chunk of production moves.
    Production,
}

/// A snapshot of the thermodynamic state and move statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub kind: CheckpointKind,
    /// Production moves attempted so far.
    pub steps: u64,
    pub n_objects: usize,
    pub pressure: f64,
    pub beta: f64,
    pub area: f64,
    pub density: f64,
    pub energy: f64,
    pub accepted: u64,
    pub attempted: u64,
    pub amplitude: f64,
}

#[derive(Debug, Clone)]
pub enum Progress {
    PhaseStart { name: &'static str },
    PhaseFinish,

    TaskStart { total_steps: u64 },
    TaskAdvance { steps: u64 },
    TaskFinish,

    Checkpoint(Checkpoint),
    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }
}
