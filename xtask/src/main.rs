use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{exit, Command};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const CORE_PACKAGE: &str = "vfm_export_core";
const LAMBDA_PACKAGE: &str = "vfm_export_lambda";
const LAMBDA_BINARY: &str = "export_lambda";
/// Entry name the `provided.al2023` runtime executes.
const BOOTSTRAP_ENTRY: &str = "bootstrap";

#[derive(Parser)]
#[command(name = "xtask", about = "Checks and Lambda packaging for the export workspace")]
struct Cli {
    #[command(subcommand)]
    command: Task,
}

#[derive(Subcommand)]
enum Task {
    /// fmt, clippy and tests, as CI runs them
    Ci {
        #[arg(value_enum, default_value_t = CheckSet::All)]
        job: CheckSet,
    },
    /// Build `export_lambda` and zip it as `<dist-dir>/export_lambda.zip`
    ServerlessPackage {
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        #[arg(value_enum, long, default_value_t = Profile::Release)]
        profile: Profile,
        #[arg(long, default_value = "dist", env = "EXPORT_LAMBDA_DIST_DIR")]
        dist_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CheckSet {
    Lint,
    Test,
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum Profile {
    Debug,
    Release,
}

impl Profile {
    fn output_dir(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }
}

fn cargo(args: &[&str]) -> Result<(), String> {
    eprintln!("+ cargo {}", args.join(" "));
    let status = Command::new("cargo")
        .args(args)
        .status()
        .map_err(|error| format!("could not start cargo: {error}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("`cargo {}` exited with {status}", args.join(" ")))
    }
}

fn run_checks(set: CheckSet) -> Result<(), String> {
    if matches!(set, CheckSet::Lint | CheckSet::All) {
        cargo(&["fmt", "--all", "--", "--check"])?;
        cargo(&["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])?;
    }
    if matches!(set, CheckSet::Test | CheckSet::All) {
        for package in [CORE_PACKAGE, LAMBDA_PACKAGE] {
            cargo(&["test", "-p", package])?;
        }
    }
    Ok(())
}

/// Fails early with an install hint when the cross target is missing.
///
/// A missing `rustup` is tolerated; the build itself reports the problem.
fn check_target_installed(target: &str) -> Result<(), String> {
    let Ok(output) = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
    else {
        eprintln!("warning: rustup not found, skipping target check for {target}");
        return Ok(());
    };

    let installed = String::from_utf8_lossy(&output.stdout);
    if installed.lines().any(|line| line.trim() == target) {
        Ok(())
    } else {
        Err(format!(
            "rust target `{target}` is missing; run `rustup target add {target}`"
        ))
    }
}

fn package_lambda(target: &str, profile: Profile, dist_dir: &Path) -> Result<PathBuf, String> {
    check_target_installed(target)?;

    let mut build = vec![
        "build",
        "-p",
        LAMBDA_PACKAGE,
        "--bin",
        LAMBDA_BINARY,
        "--target",
        target,
    ];
    if let Profile::Release = profile {
        build.push("--release");
    }
    cargo(&build)?;

    let binary = Path::new("target")
        .join(target)
        .join(profile.output_dir())
        .join(LAMBDA_BINARY);
    fs::create_dir_all(dist_dir)
        .map_err(|error| format!("cannot create '{}': {error}", dist_dir.display()))?;
    let archive = dist_dir.join(format!("{LAMBDA_BINARY}.zip"));
    write_bootstrap_zip(&binary, &archive)?;
    Ok(archive)
}

fn write_bootstrap_zip(binary: &Path, archive: &Path) -> Result<(), String> {
    let mut source = File::open(binary)
        .map_err(|error| format!("lambda binary '{}' unreadable: {error}", binary.display()))?;
    let target = File::create(archive)
        .map_err(|error| format!("cannot create '{}': {error}", archive.display()))?;

    let mut zip = ZipWriter::new(target);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file(BOOTSTRAP_ENTRY, options)
        .map_err(|error| error.to_string())?;
    io::copy(&mut source, &mut zip).map_err(|error| error.to_string())?;
    zip.finish().map_err(|error| error.to_string())?;
    Ok(())
}

fn main() {
    let outcome = match Cli::parse().command {
        Task::Ci { job } => run_checks(job).map(|()| eprintln!("checks passed")),
        Task::ServerlessPackage {
            target,
            profile,
            dist_dir,
        } => package_lambda(&target, profile, &dist_dir)
            .map(|archive| eprintln!("packaged {}", archive.display())),
    };

    if let Err(message) = outcome {
        eprintln!("error: {message}");
        exit(1);
    }
}
