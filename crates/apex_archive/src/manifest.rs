//! The `.toc` manifest written next to extracted archives
//!
//! The first line is `TOCL` followed by the archive version digit and the
//! compression token (`U`, `C` or `A`). Every following line names one member
//! relative to the archive's directory, with a trailing ` E` for members whose
//! data is external. The list ends at the first blank line or end of file.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::compression::CompressionMethod;
use crate::error::{Error, Result};
use crate::sarc::FileEntry;

/// One member line of a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Member path relative to the manifest's directory
    pub name: String,

    /// Member is recorded without embedding its data
    pub external: bool,
}

/// A parsed `.toc` manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// SARC revision to build, 2 or 3
    pub version: u32,

    /// How the built archive is wrapped
    pub compression: CompressionMethod,

    /// Members in archive order
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// File signature
    pub const MAGIC: &'static str = "TOCL";

    /// Describe an archive's members.
    pub fn from_files(version: u32, compression: CompressionMethod, files: &[FileEntry]) -> Self {
        Self {
            version,
            compression,
            entries: files
                .iter()
                .map(|f| ManifestEntry {
                    name: f.name.clone(),
                    external: f.offset == 0,
                })
                .collect(),
        }
    }

    /// Parse manifest text.
    ///
    /// An unknown compression token is reported and treated as uncompressed.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));

        let first = lines
            .next()
            .ok_or_else(|| Error::InvalidManifest("empty manifest".into()))?;

        let mut chars = first
            .strip_prefix(Self::MAGIC)
            .ok_or_else(|| Error::InvalidManifest(format!("unexpected header `{first}`")))?
            .chars();

        let version = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| Error::InvalidManifest(format!("missing version in `{first}`")))?;

        if !(2..=3).contains(&version) {
            return Err(Error::UnsupportedVersion(version));
        }

        let compression = match chars.next() {
            Some(token) => CompressionMethod::from_token(token).unwrap_or_else(|| {
                warn!("unexpected compression token {token:?}, writing uncompressed");
                CompressionMethod::None
            }),
            None => {
                warn!("missing compression token, writing uncompressed");
                CompressionMethod::None
            }
        };

        let entries = lines
            .take_while(|l| !l.is_empty())
            .map(|line| match line.strip_suffix(" E") {
                Some(name) => ManifestEntry {
                    name: name.to_owned(),
                    external: true,
                },
                None => ManifestEntry {
                    name: line.to_owned(),
                    external: false,
                },
            })
            .collect();

        Ok(Self {
            version,
            compression,
            entries,
        })
    }

    /// Path of the archive a manifest at `manifest_path` describes.
    pub fn archive_path(manifest_path: &Path) -> PathBuf {
        match manifest_path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("toc") => manifest_path.with_extension(""),
            _ => manifest_path.to_path_buf(),
        }
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}{}{}",
            Self::MAGIC,
            self.version,
            self.compression.token()
        )?;

        for entry in &self.entries {
            if entry.external {
                writeln!(f, "{} E", entry.name)?;
            } else {
                writeln!(f, "{}", entry.name)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::compression::CompressionMethod;
    use crate::error::{Error, Result};
    use crate::manifest::{Manifest, ManifestEntry};

    #[test]
    fn parse_manifest() -> Result<()> {
        let manifest = Manifest::parse("TOCL3A\r\nmodels/a.bin\nshared/b.ddsc E\n\nignored\n")?;

        assert_eq!(
            manifest,
            Manifest {
                version: 3,
                compression: CompressionMethod::Aaf,
                entries: vec![
                    ManifestEntry {
                        name: "models/a.bin".into(),
                        external: false,
                    },
                    ManifestEntry {
                        name: "shared/b.ddsc".into(),
                        external: true,
                    },
                ],
            }
        );

        Ok(())
    }

    #[test]
    fn manifest_text_round_trip() -> Result<()> {
        let text = "TOCL2C\na.txt\nb.txt E\n";
        assert_eq!(Manifest::parse(text)?.to_string(), text);

        Ok(())
    }

    #[test]
    #[traced_test]
    fn unknown_token_falls_back_to_uncompressed() -> Result<()> {
        let manifest = Manifest::parse("TOCL2X\na.txt\n")?;
        assert_eq!(manifest.compression, CompressionMethod::None);
        assert!(logs_contain("unexpected compression token"));

        Ok(())
    }

    #[test]
    fn unknown_version() {
        assert!(matches!(
            Manifest::parse("TOCL4U\n"),
            Err(Error::UnsupportedVersion(4))
        ));
        assert!(matches!(
            Manifest::parse("SARC2U\n"),
            Err(Error::InvalidManifest(_))
        ));
    }

    #[test]
    fn archive_path() {
        assert_eq!(
            Manifest::archive_path(Path::new("dir/archive.sarc.toc")),
            Path::new("dir/archive.sarc")
        );
    }
}
