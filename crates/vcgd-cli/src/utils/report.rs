use vcgd::engine::progress::{Checkpoint, CheckpointKind};

/// Renders a checkpoint as the plain-text report printed on stdout.
pub fn format_checkpoint(checkpoint: &Checkpoint) -> String {
    match checkpoint.kind {
        CheckpointKind::Loaded | CheckpointKind::Relaxed => {
            let title = if checkpoint.kind == CheckpointKind::Loaded {
                "Configuration loaded"
            } else {
                "After initial adjustments:"
            };
            format!(
                "{}\nN objects = {:>9} Pressure = {:>9}   Beta = {:>9}\nArea      = {:>9}  Density = {:>9} Energy = {:>9}",
                title,
                checkpoint.n_objects,
                checkpoint.pressure,
                checkpoint.beta,
                checkpoint.area,
                checkpoint.density,
                checkpoint.energy
            )
        }
        CheckpointKind::Production => format!(
            "After {} steps N = {}, P = {}, beta = {}\nArea = {}, Density = {} Energy = {}\nMoves {} in {}, Dist_max = {}",
            checkpoint.steps,
            checkpoint.n_objects,
            checkpoint.pressure,
            checkpoint.beta,
            checkpoint.area,
            checkpoint.density,
            checkpoint.energy,
            checkpoint.accepted,
            checkpoint.attempted,
            checkpoint.amplitude
        ),
    }
}
