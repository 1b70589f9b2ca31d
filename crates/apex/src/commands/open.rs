use std::path::PathBuf;

use apex_archive::FileKind;
use miette::Result;
use tracing::info;

use crate::commands::{sarc, sniff_file, texture};
use crate::dispatch;
use crate::settings::Settings;

/// Handle each input according to what it contains: archives are extracted,
/// manifests are built and textures are converted.
pub fn handle(files: &[PathBuf], settings: &Settings) -> Result<()> {
    let inputs = texture::convert::collect_inputs(files, settings.texture.folder_scan_ddsc_only);
    let convert = settings.texture.convert_options();

    dispatch::run(&inputs, |path| match sniff_file(path)? {
        FileKind::Aaf | FileKind::Sarc | FileKind::ZlibSarc => {
            sarc::extract::extract_archive(path, &settings.archive)
        }
        FileKind::Manifest => {
            info!("manifest detected");
            sarc::build::build_manifest(path, &settings.archive)
        }
        FileKind::Avtx | FileKind::Dds => texture::convert::convert_texture(path, &convert),
    })
}
