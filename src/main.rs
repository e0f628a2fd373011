use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use env_logger::Env;
use log::debug;

mod artifact;
mod env;
mod error;
mod manifest;
mod updater;
mod util;

use crate::error::UpdateError;
use crate::updater::{ManifestUpdater, Release};

#[derive(Parser, Debug)]
#[command(
    name = "update-apps-json",
    author,
    version,
    about = "Insert a new build into the apps.json distribution manifest"
)]
struct Cli {
    /// Marketing version of the build, e.g. 1.1.
    #[arg(value_name = "VERSION")]
    app_version: String,

    /// Build number.
    #[arg(allow_negative_numbers = true)]
    build: String,

    /// Public download URL of the artifact.
    download_url: String,

    /// Artifact size in bytes.
    #[arg(allow_negative_numbers = true)]
    size_bytes: String,

    /// Hex SHA-256 digest of the artifact.
    sha256: String,

    /// Anything after the digest is ignored.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    extra: Vec<String>,

    /// Manifest to update.
    #[arg(long, default_value_os_t = env::default_manifest_path())]
    manifest: PathBuf,

    /// Bundle identifier of the app receiving the build.
    #[arg(long, default_value = env::DEFAULT_BUNDLE_ID)]
    bundle_id: String,

    /// Number of versions to keep for the app.
    #[arg(
        long,
        default_value_t = env::DEFAULT_KEEP,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    keep: u64,

    /// Verify size and digest against a local copy of the artifact first.
    #[arg(long, value_name = "PATH")]
    artifact: Option<PathBuf>,

    /// Print the updated manifest instead of writing it.
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn release(&self) -> Release {
        Release {
            version: self.app_version.clone(),
            build: self.build.clone(),
            download_url: self.download_url.clone(),
            size: self.size_bytes.clone(),
            sha256: self.sha256.clone(),
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => return report(&UpdateError::from(err)),
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

fn run(cli: &Cli) -> Result<(), UpdateError> {
    let release = cli.release();
    if !cli.extra.is_empty() {
        debug!("cli: ignoring {} extra argument(s)", cli.extra.len());
    }

    if let Some(path) = &cli.artifact {
        let size = util::parse_integer("size", &release.size)?;
        let size = u64::try_from(size).map_err(|_| UpdateError::InvalidArgument {
            field: "size",
            value: release.size.clone(),
        })?;
        artifact::verify(path, size, &release.sha256)?;
    }

    let keep = usize::try_from(cli.keep).unwrap_or(usize::MAX);
    let updater = ManifestUpdater::new(&cli.manifest, &cli.bundle_id, keep);
    let today = env::today();

    if cli.dry_run {
        let (rendered, summary) = updater.preview(&release, today)?;
        print!("{rendered}");
        eprintln!(
            "{}",
            dry_run_notice(updater.path(), &summary.version, &release.build)
        );
        return Ok(());
    }

    let summary = updater.update(&release, today)?;
    debug!(
        "update: replaced existing entry: {}, dropped: {}",
        summary.replaced, summary.dropped
    );
    println!(
        "Successfully updated {} to version {} (Build {})",
        manifest_label(updater.path()),
        summary.version,
        release.build
    );
    Ok(())
}

// Goes to stderr so stdout carries only the rendered manifest.
fn dry_run_notice(path: &Path, version: &str, build: &str) -> String {
    format!(
        "Dry run: {} left unchanged, would update to version {version} (Build {build})",
        manifest_label(path)
    )
}

fn manifest_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Print `err` for the operator and pick the process exit status.
fn report(err: &UpdateError) -> ExitCode {
    match err {
        UpdateError::Usage(usage) => {
            let _ = usage.print();
        }
        err if err.is_recoverable() => println!("Error: {err}"),
        err => eprintln!("Error: {err}"),
    }
    ExitCode::from(exit_status(err))
}

fn exit_status(err: &UpdateError) -> u8 {
    if err.is_recoverable() { 0 } else { 1 }
}
