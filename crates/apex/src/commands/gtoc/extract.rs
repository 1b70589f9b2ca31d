use std::fs;
use std::path::{Path, PathBuf};

use apex_archive::{gtoc::find_in, ArchiveToc};
use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use tracing::info;

use crate::dispatch;
use crate::settings::Settings;

#[derive(Args)]
pub struct ExtractArgs {
    /// Archives to extract
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

impl ExtractArgs {
    pub fn handle(&self, settings: &Settings) -> Result<()> {
        let tables = [
            &settings.gtoc.sarc0_gtoc_path,
            &settings.gtoc.expentities_gtoc_path,
        ]
        .into_iter()
        .map(|path| load_table(path))
        .collect::<Result<Vec<_>>>()?;

        dispatch::run(&self.files, |path| extract_archive(path, &tables))
    }
}

fn load_table(path: &Path) -> Result<ArchiveToc> {
    let data = fs::read(path)
        .into_diagnostic()
        .context(format!("opening GTOC table {}", path.display()))?;

    let toc = ArchiveToc::from_bytes(&data).context(format!("loading {}", path.display()))?;
    info!("loaded {} archives from {}", toc.len(), path.display());

    Ok(toc)
}

/// Extract the archive at `path` into its directory using the member list
/// found in `tables`.
fn extract_archive(path: &Path, tables: &[ArchiveToc]) -> Result<()> {
    let data = fs::read(path)
        .into_diagnostic()
        .context(format!("reading {}", path.display()))?;

    let hash = data
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or_else(|| miette!("{} is too short to be an archive", path.display()))?;

    let entry = find_in(tables, hash).context("looking up the archive in the global tables")?;
    let count = entry.extract_files(&data, path.parent().unwrap_or(Path::new("")))?;
    info!("{count} files extracted");

    Ok(())
}
