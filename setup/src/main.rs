//! Development environment setup.
//!
//! Installs, tests, and builds each sub-project found under the project root
//! and exits non-zero if any executed step failed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::debug;

use setup::exit_codes;
use setup::io::config::{CONFIG_FILE_NAME, load_config, write_config};
use setup::io::reporter::ConsoleReporter;
use setup::io::step_runner::ProcessStepRunner;
use setup::io::units::project_root_for_executable;
use setup::{logging, sequence};

#[derive(Parser)]
#[command(
    name = "setup",
    version,
    about = "Install, test, and build every sub-project of a development checkout"
)]
struct Cli {
    /// Project root. Defaults to one level above the directory holding this executable.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Config file. Defaults to `<root>/setup.toml`; a missing file means built-in steps.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective config to the config path and exit without running steps.
    #[arg(long)]
    write_config: bool,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let project_root = resolve_project_root(cli.root.as_deref())?;
    let config_path = cli
        .config
        .unwrap_or_else(|| project_root.join(CONFIG_FILE_NAME));
    let config = load_config(&config_path)?;
    debug!(
        project_root = %project_root.display(),
        config = %config_path.display(),
        "starting setup"
    );

    if cli.write_config {
        write_config(&config_path, &config)?;
        println!("wrote {}", config_path.display());
        return Ok(exit_codes::OK);
    }

    let runner = ProcessStepRunner {
        timeout: config.step_timeout(),
        output_limit_bytes: config.output_limit_bytes,
    };
    let mut reporter = ConsoleReporter::new(std::io::stdout().lock());
    let result = sequence::run(&project_root, &config, &runner, &mut reporter);

    if result.overall_success() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::FAILED)
    }
}

fn resolve_project_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let root = match explicit {
        Some(root) => root.to_path_buf(),
        None => {
            let exe = std::env::current_exe().context("locate current executable")?;
            project_root_for_executable(&exe).with_context(|| {
                format!("no project root above executable {}", exe.display())
            })?
        }
    };
    if !root.is_dir() {
        bail!("project root {} is not a directory", root.display());
    }
    Ok(root)
}
