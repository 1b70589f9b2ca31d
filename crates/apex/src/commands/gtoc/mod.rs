pub mod extract;

use miette::Result;

use crate::settings::Settings;

#[derive(clap::Subcommand)]
pub enum GtocCommands {
    /// Extract archives whose contents are only listed in the GTOC tables
    Extract(extract::ExtractArgs),
}

impl GtocCommands {
    pub fn handle(&self, settings: &Settings) -> Result<()> {
        match self {
            GtocCommands::Extract(extract) => extract.handle(settings),
        }
    }
}
