use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use apex_archive::{pack::unwrap_archive, CompressionMethod, ExtractOptions, SarcFormat, SmallArchive};
use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use tracing::info;

use crate::dispatch;
use crate::settings::{ArchiveSettings, Settings};

#[derive(Args)]
pub struct ExtractArgs {
    /// Archives to extract, plain or compressed
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

impl ExtractArgs {
    pub fn handle(&self, settings: &Settings) -> Result<()> {
        dispatch::run(&self.files, |path| {
            extract_archive(path, &settings.archive)
        })
    }
}

/// Extract the archive at `path` into its directory, with a `.toc` manifest
/// next to it when enabled.
pub fn extract_archive(path: &Path, settings: &ArchiveSettings) -> Result<()> {
    let data = fs::read(path)
        .into_diagnostic()
        .context(format!("reading {}", path.display()))?;

    let (data, compression) = unwrap_archive(data)?;
    if compression != CompressionMethod::None {
        info!("{compression:?} compression detected");
    }

    let archive = SmallArchive::from_bytes(&data)?;

    let manifest_path = settings.generate_toc.then(|| {
        let mut manifest = OsString::from(path.as_os_str());
        manifest.push(".toc");
        PathBuf::from(manifest)
    });

    let options = ExtractOptions::builder()
        .output_dir(path.parent().unwrap_or(Path::new("")))
        .maybe_manifest_path(manifest_path)
        .compression(compression)
        .build();

    let count = archive
        .extract_files(&data, &options)
        .context(format!("extracting {}", path.display()))?;
    info!("{count} files extracted");

    Ok(())
}
