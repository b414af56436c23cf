use crate::cli::Cli;
use crate::config::{AppConfig, PartialRunConfig};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use vcgd::core::forcefield::params::ForceField;
use vcgd::core::io::config_file::ConfigFile;
use vcgd::core::io::postscript::write_eps;
use vcgd::core::io::traits::ConfigurationFile;
use vcgd::core::models::configuration::Configuration;
use vcgd::core::topology::registry::Topology;
use vcgd::engine::progress::ProgressReporter;
use vcgd::workflows;

pub fn run(args: Cli) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialRunConfig::from_file(path)?,
        None => PartialRunConfig::default(),
    };
    info!("Merging run settings from file and CLI arguments...");
    let app = partial_config.merge_with_cli(&args)?;
    debug!("Final run settings: {:?}", app);

    let forcefield = load_forcefield(&app)?;
    let topology = load_topology(&app)?;
    let mut configuration = load_configuration(&app)?;
    configuration.set_topology(Arc::new(topology))?;

    // Fail on an unwritable destination before spending time on the run.
    let output = open_staging_file(&app.final_config)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the NVT workflow...");
    let result = workflows::nvt::run(&mut configuration, &forcefield, &app.core_config, &reporter)?;
    info!(
        seed = result.seed,
        energy = result.final_energy,
        relaxation_steps = result.relaxation_steps,
        "Workflow finished."
    );

    info!("Writing final configuration to {:?}", &app.final_config);
    let mut writer = BufWriter::new(output);
    ConfigFile::write_to(&configuration, &mut writer).map_err(|e| CliError::FileParsing {
        path: app.final_config.clone(),
        source: e.into(),
    })?;
    let output = writer
        .into_inner()
        .map_err(|e| CliError::Io(e.into_error()))?;
    output
        .persist(&app.final_config)
        .map_err(|e| CliError::FileAccess {
            path: app.final_config.clone(),
            source: e.error,
        })?;

    if let Some(path) = &app.snapshot_path {
        write_snapshot(&configuration, &forcefield, path)?;
    }

    println!("\n...Done...");
    Ok(())
}

/// Creates a temporary file next to `destination`. It is renamed onto the
/// destination once the run succeeds and removed otherwise.
fn open_staging_file(destination: &Path) -> Result<NamedTempFile> {
    let access_error = |source: std::io::Error| CliError::FileAccess {
        path: destination.to_path_buf(),
        source,
    };
    if destination.is_dir() {
        return Err(access_error(std::io::Error::new(
            std::io::ErrorKind::IsADirectory,
            "destination is a directory",
        )));
    }
    let directory = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    NamedTempFile::new_in(directory).map_err(access_error)
}

fn load_forcefield(app: &AppConfig) -> Result<ForceField> {
    match &app.forcefield_path {
        Some(path) => {
            info!("Loading force field from {:?}", path);
            ForceField::load(path).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })
        }
        None => {
            info!("Using the built-in force field.");
            ForceField::builtin().map_err(|e| CliError::Other(e.into()))
        }
    }
}

fn load_topology(app: &AppConfig) -> Result<Topology> {
    match &app.topology_path {
        Some(path) => {
            info!("Loading topology from {:?}", path);
            Topology::load(path).map_err(|e| CliError::FileParsing {
                path: path.clone(),
                source: e.into(),
            })
        }
        None => {
            info!("Using the built-in topology.");
            Topology::builtin().map_err(|e| CliError::Other(e.into()))
        }
    }
}

fn load_configuration(app: &AppConfig) -> Result<Configuration> {
    info!("Loading initial configuration from {:?}", &app.initial_config);
    ConfigFile::read_path_with_periodicity(&app.initial_config, app.periodic).map_err(|e| {
        CliError::FileParsing {
            path: app.initial_config.clone(),
            source: e.into(),
        }
    })
}

fn write_snapshot(configuration: &Configuration, forcefield: &ForceField, path: &Path) -> Result<()> {
    info!("Writing Postscript snapshot to {:?}", path);
    let file = File::create(path).map_err(|source| CliError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    write_eps(configuration, forcefield, &mut writer)?;
    writer.flush()?;
    Ok(())
}
