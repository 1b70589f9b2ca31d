pub mod gtoc;
pub mod open;
pub mod sarc;
pub mod texture;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use apex_archive::FileKind;
use miette::{Context, IntoDiagnostic, Result};

use crate::settings::Settings;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle SARC archives
    Sarc {
        #[command(subcommand)]
        command: sarc::SarcCommands,
    },
    /// Handle archives listed in GTOC tables
    Gtoc {
        #[command(subcommand)]
        command: gtoc::GtocCommands,
    },
    /// Handle AVTX and DDS textures
    Texture {
        #[command(subcommand)]
        command: texture::TextureCommands,
    },
}

impl Commands {
    pub fn handle(&self, settings: &Settings) -> Result<()> {
        match self {
            Commands::Sarc { command } => command.handle(settings),
            Commands::Gtoc { command } => command.handle(settings),
            Commands::Texture { command } => command.handle(settings),
        }
    }
}

/// Identify the file at `path` from its first bytes.
pub fn sniff_file(path: &Path) -> Result<FileKind> {
    let mut magic = Vec::with_capacity(4);
    File::open(path)
        .into_diagnostic()
        .context(format!("opening {}", path.display()))?
        .take(4)
        .read_to_end(&mut magic)
        .into_diagnostic()?;

    Ok(FileKind::sniff(&magic)?)
}
