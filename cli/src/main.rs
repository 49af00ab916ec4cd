//! Command-line interface for the backup engine.
//!
//! Manages the JSON configuration file (locations, target folder, mode,
//! archive-reset flag) and executes backup runs, rendering the engine's
//! event stream as progress output on stderr.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use engine::{
    BackupConfig, BackupEvent, BackupManager, BackupMode, ConfigStore, NoRunLog, RunSummary,
};

/// Back up prioritized directories with full or incremental runs
#[derive(Parser, Debug)]
#[command(name = "backup")]
#[command(version = "0.1.0")]
#[command(about = "Back up prioritized directories into timestamped folders")]
struct Args {
    /// Configuration file
    #[arg(long, value_name = "FILE", default_value = "backup.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a backup run
    Run {
        /// Override the configured mode for this run: full or incremental
        #[arg(long, value_name = "MODE")]
        mode: Option<String>,

        /// Print every file as it is copied
        #[arg(long)]
        verbose: bool,
    },

    /// Manage backup locations
    Locations {
        #[command(subcommand)]
        action: LocationsCommand,
    },

    /// Update configuration parameters
    Set {
        /// Folder backups are written under
        #[arg(long, value_name = "PATH")]
        target: Option<PathBuf>,

        /// Backup mode: full or incremental
        #[arg(long, value_name = "MODE")]
        mode: Option<String>,

        /// Clear the archive attribute after each successful copy
        #[arg(long, value_name = "BOOL")]
        reset_archive: Option<bool>,
    },
}

#[derive(Subcommand, Debug)]
enum LocationsCommand {
    /// List locations in priority order
    List,

    /// Add a directory to the backup set
    Add { path: PathBuf },

    /// Remove a directory from the backup set
    Remove { path: PathBuf },

    /// Exchange the priorities of two locations
    Swap { first: PathBuf, second: PathBuf },

    /// Move a location one step earlier in the copy order
    Raise { path: PathBuf },
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_idx])
}

fn format_duration(elapsed: std::time::Duration) -> String {
    let secs = elapsed.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

fn progress_bar(percent: u32) -> String {
    let filled = (percent.min(100) / 5) as usize;
    let empty = 20 - filled;
    format!("[{}{}] {}%", "=".repeat(filled), " ".repeat(empty), percent)
}

fn parse_mode(value: &str) -> Result<BackupMode, String> {
    match value.to_lowercase().as_str() {
        "full" => Ok(BackupMode::Full),
        "incremental" => Ok(BackupMode::Incremental),
        _ => Err(format!(
            "Invalid mode '{}'. Must be 'full' or 'incremental'",
            value
        )),
    }
}

fn load_config(path: &Path) -> Result<BackupConfig, String> {
    if path.exists() {
        BackupConfig::load(path).map_err(|e| e.to_string())
    } else {
        Ok(BackupConfig::new())
    }
}

fn save_config(config: &BackupConfig, path: &Path) -> Result<(), String> {
    config.persist(path).map_err(|e| e.to_string())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let exit_code = match run_cli(&args) {
        Ok(()) => 0,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

/// Main CLI logic - separated for testability
fn run_cli(args: &Args) -> Result<(), String> {
    match &args.command {
        Command::Run { mode, verbose } => run_backup(&args.config, mode.as_deref(), *verbose),
        Command::Locations { action } => manage_locations(&args.config, action),
        Command::Set {
            target,
            mode,
            reset_archive,
        } => update_settings(&args.config, target.as_deref(), mode.as_deref(), *reset_archive),
    }
}

fn manage_locations(config_path: &Path, action: &LocationsCommand) -> Result<(), String> {
    let mut config = load_config(config_path)?;

    match action {
        LocationsCommand::List => {
            for location in config.locations() {
                println!("{}", location);
            }
            return Ok(());
        }
        LocationsCommand::Add { path } => {
            if !config.add_location(path.clone()) {
                return Err(format!(
                    "Location is empty or already configured: {}",
                    path.display()
                ));
            }
        }
        LocationsCommand::Remove { path } => {
            if !config.remove_location(path) {
                return Err(format!("Unknown location: {}", path.display()));
            }
        }
        LocationsCommand::Swap { first, second } => {
            config
                .swap_priorities(first, second)
                .map_err(|e| e.to_string())?;
        }
        LocationsCommand::Raise { path } => {
            let current = config
                .find_location(path)
                .ok_or_else(|| format!("Unknown location: {}", path.display()))?;
            let above = config
                .location_above(&current)
                .ok_or_else(|| format!("{} is already first in the copy order", path.display()))?;
            config
                .swap_priorities(path, &above.path)
                .map_err(|e| e.to_string())?;
        }
    }

    save_config(&config, config_path)
}

fn update_settings(
    config_path: &Path,
    target: Option<&Path>,
    mode: Option<&str>,
    reset_archive: Option<bool>,
) -> Result<(), String> {
    if target.is_none() && mode.is_none() && reset_archive.is_none() {
        return Err("Nothing to set; pass --target, --mode, or --reset-archive".to_string());
    }

    let mut config = load_config(config_path)?;
    if let Some(target) = target {
        config.set_target_folder(target);
    }
    if let Some(mode) = mode {
        config.set_mode(parse_mode(mode)?);
    }
    if let Some(reset) = reset_archive {
        config.set_reset_archive(reset);
    }

    save_config(&config, config_path)
}

fn run_backup(config_path: &Path, mode_override: Option<&str>, verbose: bool) -> Result<(), String> {
    let mut config = load_config(config_path)?;
    if let Some(mode) = mode_override {
        config.set_mode(parse_mode(mode)?);
    }

    let manager = BackupManager::new(Arc::new(Mutex::new(config)), Arc::new(NoRunLog));
    let run = manager.start_run().map_err(|e| e.to_string())?;

    let mut failures = 0usize;
    let mut finished: Option<RunSummary> = None;

    for event in run.events().iter() {
        match event {
            BackupEvent::RunStarted { mode, .. } => {
                eprintln!("Starting {} backup...", mode);
            }
            BackupEvent::SizeCalculated { total_bytes, .. } => {
                eprint!("\rCalculating backup size: {}", format_bytes(total_bytes));
                let _ = std::io::Write::flush(&mut std::io::stderr());
            }
            BackupEvent::FileSucceeded {
                source, progress, ..
            } => {
                if verbose {
                    eprintln!("\nCopied: {}", source.display());
                }
                let percent = (progress.ratio() * 100.0) as u32;
                eprint!(
                    "\rProgress: {} | {}/{}",
                    progress_bar(percent),
                    format_bytes(progress.attempted),
                    format_bytes(progress.planned)
                );
                let _ = std::io::Write::flush(&mut std::io::stderr());
            }
            BackupEvent::FileFailed { message, .. } => {
                failures += 1;
                eprintln!("\n{}", message);
            }
            BackupEvent::RunFinished { summary, .. } => {
                finished = Some(summary);
            }
        }
    }
    run.wait();

    let summary = finished.ok_or_else(|| "The run ended without a finished event".to_string())?;

    eprintln!();
    eprintln!("Backup complete!");
    if let Some(destination) = &summary.destination {
        eprintln!("  Destination: {}", destination.display());
    }
    eprintln!(
        "  Files: {} copied, {} failed",
        summary.files_copied, summary.files_failed
    );
    eprintln!("  Bytes copied: {}", format_bytes(summary.bytes_copied));
    eprintln!("  Elapsed: {}", format_duration(summary.elapsed));
    eprintln!(
        "  Throughput: {}/s",
        format_bytes(summary.throughput() as u64)
    );

    if failures > 0 {
        Err("One or more items failed to back up".to_string())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, config: &BackupConfig) -> PathBuf {
        let path = dir.path().join("backup.json");
        config.persist(&path).expect("Failed to persist config");
        path
    }

    #[test]
    fn run_backs_up_configured_locations() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let src = dir.path().join("src");
        fs::create_dir(&src).expect("Failed to create src dir");
        fs::write(src.join("file.txt"), b"hello").expect("Failed to write file");

        let target = dir.path().join("backup");
        let mut config = BackupConfig::new();
        config.add_location(src);
        config.set_target_folder(&target);

        let config_path = write_config(&dir, &config);
        let args = Args {
            config: config_path,
            command: Command::Run {
                mode: None,
                verbose: false,
            },
        };

        run_cli(&args).expect("CLI run should succeed");

        // One timestamped run directory with the snapshot inside it.
        let runs: Vec<_> = fs::read_dir(&target)
            .expect("Failed to read target")
            .collect::<Result<_, _>>()
            .expect("Failed to read entries");
        assert_eq!(runs.len(), 1);
        let run_dir = runs[0].path();
        assert!(run_dir.join(engine::SNAPSHOT_FILE_NAME).exists());

        let snapshot = BackupConfig::load(&run_dir.join(engine::SNAPSHOT_FILE_NAME))
            .expect("Failed to load snapshot");
        assert_eq!(snapshot.copied_files().len(), 1);
    }

    #[test]
    fn run_reports_failures_with_nonzero_result() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut config = BackupConfig::new();
        config.add_location(dir.path().join("absent"));
        config.set_target_folder(dir.path().join("backup"));

        let config_path = write_config(&dir, &config);
        let args = Args {
            config: config_path,
            command: Command::Run {
                mode: None,
                verbose: false,
            },
        };

        assert!(run_cli(&args).is_err(), "Missing location should fail the run");
    }

    #[test]
    fn run_rejects_invalid_mode_override() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = write_config(&dir, &BackupConfig::new());
        let args = Args {
            config: config_path,
            command: Command::Run {
                mode: Some("differential".to_string()),
                verbose: false,
            },
        };

        assert!(run_cli(&args).is_err(), "CLI should reject an unknown mode");
    }

    #[test]
    fn locations_add_and_swap_persist() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = dir.path().join("backup.json");

        for path in ["/a", "/b", "/c"] {
            let args = Args {
                config: config_path.clone(),
                command: Command::Locations {
                    action: LocationsCommand::Add {
                        path: PathBuf::from(path),
                    },
                },
            };
            run_cli(&args).expect("Failed to add location");
        }

        let args = Args {
            config: config_path.clone(),
            command: Command::Locations {
                action: LocationsCommand::Swap {
                    first: PathBuf::from("/b"),
                    second: PathBuf::from("/c"),
                },
            },
        };
        run_cli(&args).expect("Failed to swap locations");

        let config = BackupConfig::load(&config_path).expect("Failed to reload config");
        let order: Vec<_> = config.locations().into_iter().map(|l| l.path).collect();
        assert_eq!(
            order,
            vec![
                PathBuf::from("/a"),
                PathBuf::from("/c"),
                PathBuf::from("/b")
            ]
        );
    }

    #[test]
    fn locations_add_rejects_duplicates() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = dir.path().join("backup.json");

        let add = |path: &str| Args {
            config: config_path.clone(),
            command: Command::Locations {
                action: LocationsCommand::Add {
                    path: PathBuf::from(path),
                },
            },
        };

        run_cli(&add("/data/docs")).expect("First add should succeed");
        assert!(run_cli(&add("/data/docs")).is_err(), "Duplicate add should fail");
    }

    #[test]
    fn raise_moves_location_one_step_earlier() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = dir.path().join("backup.json");

        let mut config = BackupConfig::new();
        config.add_location("/a");
        config.add_location("/b");
        config.persist(&config_path).expect("Failed to persist");

        let args = Args {
            config: config_path.clone(),
            command: Command::Locations {
                action: LocationsCommand::Raise {
                    path: PathBuf::from("/b"),
                },
            },
        };
        run_cli(&args).expect("Failed to raise location");

        let config = BackupConfig::load(&config_path).expect("Failed to reload config");
        let order: Vec<_> = config.locations().into_iter().map(|l| l.path).collect();
        assert_eq!(order, vec![PathBuf::from("/b"), PathBuf::from("/a")]);

        // Raising the first location has nowhere to go.
        assert!(run_cli(&args).is_err());
    }

    #[test]
    fn set_updates_parameters() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = dir.path().join("backup.json");

        let args = Args {
            config: config_path.clone(),
            command: Command::Set {
                target: Some(PathBuf::from("/backup")),
                mode: Some("incremental".to_string()),
                reset_archive: Some(true),
            },
        };
        run_cli(&args).expect("Failed to update settings");

        let config = BackupConfig::load(&config_path).expect("Failed to reload config");
        assert_eq!(config.target_folder(), Some(PathBuf::from("/backup")));
        assert_eq!(config.mode(), BackupMode::Incremental);
        assert!(config.archive_reset());
    }

    #[test]
    fn set_without_arguments_is_rejected() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let args = Args {
            config: dir.path().join("backup.json"),
            command: Command::Set {
                target: None,
                mode: None,
                reset_archive: None,
            },
        };
        assert!(run_cli(&args).is_err());
    }

    #[test]
    fn format_bytes_scales_units() {
        assert_eq!(format_bytes(512), "512.00 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn format_duration_picks_largest_unit() {
        use std::time::Duration;
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3700)), "1h 1m 40s");
    }
}
