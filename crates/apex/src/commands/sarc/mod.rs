pub mod build;
pub mod create;
pub mod extract;

use miette::Result;

use crate::settings::Settings;

#[derive(clap::Subcommand)]
pub enum SarcCommands {
    /// Extract archives next to themselves
    Extract(extract::ExtractArgs),
    /// Pack a directory into an archive
    Create(create::CreateArgs),
    /// Build the archives described by `.toc` manifests
    Build(build::BuildArgs),
}

impl SarcCommands {
    pub fn handle(&self, settings: &Settings) -> Result<()> {
        match self {
            SarcCommands::Extract(extract) => extract.handle(settings),
            SarcCommands::Create(create) => create.handle(settings),
            SarcCommands::Build(build) => build.handle(settings),
        }
    }
}
