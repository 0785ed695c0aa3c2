use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use simplelog::{LevelFilter, WriteLogger};

use kanjigo::replay::{ReplayReport, load_script, run_script};
use kanjigo::settings::YamlSettingsStore;
use kanjigo::sim::RenderCall;

/// Replay a scripted browsing session against the popup engine and print
/// every surface it mounts or unmounts.
#[derive(Parser, Debug)]
#[command(name = "kanjigo", version, about)]
struct Cli {
    /// YAML script describing the page and the user's actions
    script: PathBuf,

    /// Settings file to use instead of the script's `settings` section
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Use ~/.kanjigo_settings.yaml instead of the script's `settings` section
    #[arg(long, conflicts_with = "settings")]
    user_settings: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    #[arg(long, default_value = "kanjigo.log")]
    log_file: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    WriteLogger::init(
        LevelFilter::Debug,
        simplelog::ConfigBuilder::new()
            .set_max_level(LevelFilter::Debug)
            .build(),
        File::create(&cli.log_file)
            .with_context(|| format!("Failed to create log file {}", cli.log_file.display()))?,
    )?;

    info!("Starting kanjigo replay of {}", cli.script.display());

    let mut script = load_script(&cli.script)?;
    let store = match &cli.settings {
        Some(path) => Some(
            YamlSettingsStore::open(path)
                .with_context(|| format!("Failed to open settings {}", path.display()))?,
        ),
        None if cli.user_settings => {
            Some(YamlSettingsStore::open_default().context("Failed to open user settings")?)
        }
        None => None,
    };
    if let Some(store) = store {
        info!("Using settings from {:?}", store.path());
        script.settings = store.settings();
    }

    let report = match run_script(&script) {
        Ok(report) => report,
        Err(err) => {
            error!("Replay failed: {err:?}");
            return Err(err);
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    info!("Shutting down kanjigo");
    Ok(())
}

fn print_report(report: &ReplayReport) {
    for timed in &report.calls {
        match &timed.call {
            RenderCall::Mount(request) => println!(
                "{:>6}ms  mount    {:?} at ({:.0}, {:.0}) {:?}",
                timed.at_ms,
                request.kind,
                request.position.left,
                request.position.top,
                request.text
            ),
            RenderCall::Unmount { kind } => {
                println!("{:>6}ms  unmount  {kind:?}", timed.at_ms)
            }
            RenderCall::MountFailed { kind } => {
                println!("{:>6}ms  failed   {kind:?}", timed.at_ms)
            }
        }
    }
    if report.final_surfaces.is_empty() {
        println!("no surfaces left mounted");
    } else {
        println!("still mounted: {:?}", report.final_surfaces);
    }
}
