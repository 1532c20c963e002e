use std::path::PathBuf;

mod logger;

use clap::Parser;
use unified_param::prelude::*;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "uparam")]
#[command(about = "Inspect and edit a unified parameter tree")]
struct Cli {
    /// Manager configuration (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// YAML parameter overrides applied after the default catalog
    #[arg(long, value_name = "FILE")]
    overrides: Option<PathBuf>,

    /// Load parameters saved with --export
    #[arg(long, value_name = "FILE")]
    load: Option<PathBuf>,

    /// Set a parameter, e.g. `--set geometry/transform/scale=2.5`
    #[arg(long = "set", value_name = "PATH=VALUE")]
    sets: Vec<String>,

    /// Print a parameter value
    #[arg(long = "get", value_name = "PATH")]
    gets: Vec<String>,

    /// List parameter paths, optionally limited to one category
    #[arg(long, value_name = "CATEGORY", num_args = 0..=1, default_missing_value = "")]
    list: Option<String>,

    /// Write the whole tree as JSON and exit
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Output values and logs as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    logger::init_logger(cli.json, cli.debug);

    let manager = manager_builder(&cli).build()?;

    tracing::info!(
        parameters = manager.all_parameter_paths().len(),
        "Parameter manager ready"
    );

    if let Some(path) = &cli.load {
        let report = manager.load_from_json(path)?;
        tracing::info!(
            applied = report.applied,
            rejected = report.rejected,
            unknown = report.unknown,
            "Loaded {:?}",
            path
        );
    }

    apply_sets(&manager, &cli.sets)?;

    if !cli.gets.is_empty() {
        print_values(&manager, &cli.gets, cli.json)?;
    }

    if let Some(category) = &cli.list {
        let paths = if category.is_empty() {
            manager.all_parameter_paths()
        } else {
            manager.tree().parameter_paths_in_category(category)
        };
        print_values(&manager, &paths, cli.json)?;
    }

    if let Some(path) = &cli.export {
        manager.save_to_json(path)?;
        tracing::info!("Exported parameters to {:?}", path);
    }

    Ok(())
}

/// `--debug` only turns debug mode on. Without it the config file decides.
fn manager_builder(cli: &Cli) -> UnifiedParameterManagerBuilder {
    let mut builder = UnifiedParameterManagerBuilder::default();
    if cli.debug {
        builder = builder.with_debug_mode(true);
    }
    if let Some(config) = &cli.config {
        builder = builder.with_config_file(config);
    }
    if let Some(overrides) = &cli.overrides {
        builder = builder.with_overrides_file(overrides);
    }
    builder
}

/// Parse every `PATH=VALUE` against the registered type, then apply them in
/// one batch.
fn apply_sets(manager: &UnifiedParameterManager, sets: &[String]) -> Result<(), BoxError> {
    let mut changes = Vec::with_capacity(sets.len());
    for set in sets {
        let (path, text) = set
            .split_once('=')
            .ok_or_else(|| format!("invalid --set '{}', expected PATH=VALUE", set))?;
        let path = path.trim();
        let current = manager.get_parameter(path);
        if !current.is_set() {
            return Err(Error::NotFound(path.to_string()).into());
        }
        let value = ParameterValue::parse_as(text, current.parameter_type())?;
        changes.push(ParameterChange::new(path, value));
    }
    if changes.is_empty() {
        return Ok(());
    }

    let batch = manager.batch();
    for change in changes {
        tracing::debug!("Setting {} = {}", change.path, change.value);
        batch.set(&change.path, change.value).into_result(&change.path)?;
    }
    Ok(())
}

fn print_values(
    manager: &UnifiedParameterManager,
    paths: &[String],
    json: bool,
) -> Result<(), BoxError> {
    if json {
        let mut map = serde_json::Map::new();
        for path in paths {
            map.insert(
                path.clone(),
                serde_json::to_value(manager.get_parameter(path))?,
            );
        }
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }
    for path in paths {
        match manager.get_parameter(path) {
            ParameterValue::NotSet if !manager.has_parameter(path) => {
                tracing::warn!("Unknown parameter {}", path)
            }
            value => println!("{} = {}", path, value),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_debug_mode_survives_without_flag() {
        let path = std::env::temp_dir().join(format!("uparam-debug-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"debug_mode": true}"#).unwrap();

        let cli = Cli::parse_from(["uparam", "--config", path.to_str().unwrap()]);
        let (config, _) = manager_builder(&cli).resolve_config().unwrap();
        std::fs::remove_file(&path).ok();
        assert!(config.debug_mode);
    }

    #[test]
    fn test_debug_flag_enables_debug_mode() {
        let cli = Cli::parse_from(["uparam", "--debug"]);
        let (config, _) = manager_builder(&cli).resolve_config().unwrap();
        assert!(config.debug_mode);
    }
}
