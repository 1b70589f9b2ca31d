use std::path::{Path, PathBuf};

use apex_archive::FileKind;
use apex_texture::{convert_avtx_file, convert_dds_file, ConvertOptions};
use clap::Args;
use miette::{miette, Result};
use tracing::info;
use walkdir::WalkDir;

use crate::commands::sniff_file;
use crate::dispatch;
use crate::settings::Settings;

#[derive(Args)]
pub struct ConvertArgs {
    /// Textures to convert, or folders to scan for them
    #[arg(required = true, value_name = "PATH")]
    inputs: Vec<PathBuf>,
}

impl ConvertArgs {
    pub fn handle(&self, settings: &Settings) -> Result<()> {
        let options = settings.texture.convert_options();
        let files = collect_inputs(&self.inputs, settings.texture.folder_scan_ddsc_only);

        dispatch::run(&files, |path| convert_texture(path, &options))
    }
}

/// Inputs without an extension are folders, expanded to the textures inside
/// them after every other input.
pub fn collect_inputs(inputs: &[PathBuf], ddsc_only: bool) -> Vec<PathBuf> {
    let (folders, mut files): (Vec<_>, Vec<_>) = inputs
        .iter()
        .cloned()
        .partition(|p| p.extension().is_none());

    for folder in folders {
        let found = WalkDir::new(&folder)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| match e.path().extension().and_then(|x| x.to_str()) {
                Some("ddsc") => true,
                Some("dds") => !ddsc_only,
                _ => false,
            })
            .map(|e| e.into_path())
            .collect::<Vec<_>>();

        info!("found {} textures in {}", found.len(), folder.display());
        files.extend(found);
    }

    files
}

/// Convert an AVTX texture to DDS or a DDS file to AVTX, depending on what
/// `path` holds.
pub fn convert_texture(path: &Path, options: &ConvertOptions) -> Result<()> {
    let report = match sniff_file(path)? {
        FileKind::Avtx => {
            info!("converting AVTX to DDS");
            convert_avtx_file(path, options)?
        }
        FileKind::Dds => {
            info!("converting DDS to AVTX");
            convert_dds_file(path, options)?
        }
        _ => return Err(miette!("{} is not a texture", path.display())),
    };

    if !report.warnings.is_empty() {
        info!("converted with {} warnings", report.warnings.len());
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::path::PathBuf;

    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;

    use crate::commands::texture::convert::collect_inputs;

    #[test]
    fn folders_come_after_files() -> Result<()> {
        let dir = tempfile::tempdir().into_diagnostic()?;
        let folder = dir.path().join("textures");
        fs::create_dir_all(folder.join("sub")).into_diagnostic()?;
        for name in ["a.ddsc", "b.dds", "sub/c.ddsc", "d.atx1"] {
            fs::write(folder.join(name), b"").into_diagnostic()?;
        }

        let direct = dir.path().join("direct.dds");
        let inputs = vec![folder.clone(), direct.clone()];

        assert_eq!(
            collect_inputs(&inputs, true),
            vec![direct.clone(), folder.join("a.ddsc"), folder.join("sub/c.ddsc")]
        );
        assert_eq!(
            collect_inputs(&inputs, false),
            vec![
                direct,
                folder.join("a.ddsc"),
                folder.join("b.dds"),
                folder.join("sub/c.ddsc"),
            ]
        );

        let none: Vec<PathBuf> = Vec::new();
        assert!(collect_inputs(&none, true).is_empty());

        Ok(())
    }
}
