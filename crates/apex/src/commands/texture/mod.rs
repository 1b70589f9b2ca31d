pub mod convert;

use miette::Result;

use crate::settings::Settings;

#[derive(clap::Subcommand)]
pub enum TextureCommands {
    /// Convert `.ddsc` textures to DDS and DDS files to `.ddsc`
    Convert(convert::ConvertArgs),
}

impl TextureCommands {
    pub fn handle(&self, settings: &Settings) -> Result<()> {
        match self {
            TextureCommands::Convert(convert) => convert.handle(settings),
        }
    }
}
