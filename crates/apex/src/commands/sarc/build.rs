use std::path::{Path, PathBuf};

use apex_archive::{pack::build_from_manifest, CompressionMethod};
use clap::Args;
use miette::{Context, Result};
use tracing::info;

use crate::dispatch;
use crate::settings::{ArchiveSettings, Settings};

#[derive(Args)]
pub struct BuildArgs {
    /// Manifests to build, the archive is named after the manifest without `.toc`
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

impl BuildArgs {
    pub fn handle(&self, settings: &Settings) -> Result<()> {
        dispatch::run(&self.files, |path| build_manifest(path, &settings.archive))
    }
}

/// Build the archive described by the manifest at `path`.
pub fn build_manifest(path: &Path, settings: &ArchiveSettings) -> Result<()> {
    // compression comes from the manifest itself
    let options = settings.create_options(CompressionMethod::None);

    let archive = build_from_manifest(path, &options)
        .context(format!("building from {}", path.display()))?;
    info!("created {}", archive.display());

    Ok(())
}
