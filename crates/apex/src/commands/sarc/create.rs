use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use apex_archive::{
    pack::{build_archive, MemberSource},
    CompressionMethod,
};
use clap::{ArgGroup, Args};
use miette::{miette, Context, IntoDiagnostic, Result};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::settings::Settings;

#[derive(Args)]
#[command(group(ArgGroup::new("wrapping").multiple(false)))]
pub struct CreateArgs {
    /// Store the archive as it is (default)
    #[arg(short = 'a', long, group = "wrapping")]
    plain: bool,

    /// Wrap the archive in a single zlib stream
    #[arg(short = 'c', long, group = "wrapping")]
    zlib: bool,

    /// Wrap the archive in an AAF container
    #[arg(short = 'f', long, group = "wrapping")]
    aaf: bool,

    /// A target archive
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// SARC version to write
    #[arg(value_parser = clap::value_parser!(u32).range(2..=3))]
    version: u32,

    /// An input directory
    #[arg(value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl CreateArgs {
    fn compression(&self) -> CompressionMethod {
        if self.zlib {
            CompressionMethod::Zlib
        } else if self.aaf {
            CompressionMethod::Aaf
        } else {
            CompressionMethod::None
        }
    }

    pub fn handle(&self, settings: &Settings) -> Result<()> {
        info!("creating {}", &self.file.display());

        let options = settings.archive.create_options(self.compression());

        let members = WalkDir::new(&self.directory)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| !options.is_ignored(e.path()))
            .map(|e| {
                let name = e
                    .path()
                    .strip_prefix(&self.directory)
                    .into_diagnostic()?
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                debug!("adding {name}");

                Ok(MemberSource {
                    name,
                    path: e.path().to_path_buf(),
                    external: false,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if members.is_empty() {
            return Err(miette!("directory is empty"));
        }

        let data = build_archive(self.version, &members, &options)
            .context(format!("packing {}", self.directory.display()))?;

        let mut out = if !self.overwrite {
            File::create_new(&self.file)
                .into_diagnostic()
                .context(format!("creating {}", &self.file.display()))?
        } else {
            File::create(&self.file)
                .into_diagnostic()
                .context(format!("creating {}", &self.file.display()))?
        };

        out.write_all(&data)
            .into_diagnostic()
            .context(format!("writing {}", &self.file.display()))?;

        info!("archive created with {} files", members.len());
        Ok(())
    }
}
