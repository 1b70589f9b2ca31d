//! Building archives from files on disk and (un)wrapping compressed archives.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use bon::Builder;
use tracing::{info, instrument, warn};

use crate::aaf::{unwrap_aaf, wrap_aaf, AafWriterOptions};
use crate::compression::{deflate_zlib, inflate_zlib, CompressionMethod};
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::sarc::{member_path, SarcFormat, SmallArchive};
use crate::sniff::FileKind;

/// Options for building an archive
#[derive(Debug, Clone, Builder)]
pub struct CreateOptions {
    /// How the archive is wrapped once built
    #[builder(default)]
    pub compression: CompressionMethod,

    /// Extensions (with the leading dot) never added to an archive
    #[builder(default)]
    pub ignore_extensions: Vec<String>,

    /// Block layout used for AAF wrapping
    #[builder(default)]
    pub aaf: AafWriterOptions,
}

impl CreateOptions {
    /// Whether `path` has one of the ignored extensions.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
            return false;
        };

        self.ignore_extensions
            .iter()
            .any(|ext| name.ends_with(&ext.to_lowercase()))
    }
}

/// A file to be added to an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSource {
    /// Path of the member inside the archive
    pub name: String,

    /// Where the data is read from, and the size taken from
    pub path: PathBuf,

    /// Record the member without embedding its data
    pub external: bool,
}

/// Build an archive of `version` from `members` and wrap it per `options`.
///
/// Members with an ignored extension are left out, as are members that cannot
/// be opened.
#[instrument(skip(members, options), fields(members = members.len()), err)]
pub fn build_archive(
    version: u32,
    members: &[MemberSource],
    options: &CreateOptions,
) -> Result<Vec<u8>> {
    let mut archive = SmallArchive::new(version)?;
    let mut embedded = Vec::new();

    for member in members {
        if options.is_ignored(&member.path) {
            continue;
        }

        let length = match fs::metadata(&member.path) {
            Ok(metadata) => u32::try_from(metadata.len()).map_err(|_| Error::Truncated)?,
            Err(err) => {
                warn!("cannot open {}: {err}", member.path.display());
                continue;
            }
        };

        archive.add_file_entry(&member.name, length, member.external);
        if !member.external {
            embedded.push(&member.path);
        }
    }

    let mut sources = embedded.into_iter();
    let data = archive.to_bytes(|file| {
        let path = sources.next().ok_or_else(|| Error::PayloadSizeMismatch {
            name: file.name.clone(),
            expected: file.length,
            actual: 0,
        })?;
        Ok(fs::read(path)?)
    })?;

    info!("built SARC v{version} with {} files", archive.files().len());

    wrap_archive(data, options.compression, &options.aaf)
}

/// Build the archive described by the manifest at `manifest_path` and write
/// it next to the manifest. Returns the path of the written archive.
#[instrument(skip(options), err)]
pub fn build_from_manifest(manifest_path: &Path, options: &CreateOptions) -> Result<PathBuf> {
    let manifest = Manifest::parse(&fs::read_to_string(manifest_path)?)?;
    let root = manifest_path.parent().unwrap_or(Path::new(""));

    let members = manifest
        .entries
        .iter()
        .filter_map(|entry| match member_path(root, &entry.name) {
            Some(path) => Some(MemberSource {
                name: entry.name.clone(),
                path,
                external: entry.external,
            }),
            None => {
                warn!("skipping {}, it escapes the manifest directory", entry.name);
                None
            }
        })
        .collect::<Vec<_>>();

    let options = CreateOptions {
        compression: manifest.compression,
        ..options.clone()
    };

    let data = build_archive(manifest.version, &members, &options)?;
    let archive_path = Manifest::archive_path(manifest_path);
    fs::write(&archive_path, data)?;

    Ok(archive_path)
}

/// Wrap a serialized archive with `compression`.
pub fn wrap_archive(
    data: Vec<u8>,
    compression: CompressionMethod,
    aaf: &AafWriterOptions,
) -> Result<Vec<u8>> {
    match compression {
        CompressionMethod::None => Ok(data),
        CompressionMethod::Zlib => deflate_zlib(&data),
        CompressionMethod::Aaf => {
            let mut output = Cursor::new(Vec::new());
            wrap_aaf(&mut output, &data, aaf)?;
            Ok(output.into_inner())
        }
    }
}

/// Strip any compression around a serialized archive, reporting which was used.
pub fn unwrap_archive(data: Vec<u8>) -> Result<(Vec<u8>, CompressionMethod)> {
    match FileKind::sniff(&data)? {
        FileKind::Sarc => Ok((data, CompressionMethod::None)),
        FileKind::ZlibSarc => Ok((inflate_zlib(&data)?, CompressionMethod::Zlib)),
        FileKind::Aaf => Ok((
            unwrap_aaf(&mut Cursor::new(&data))?,
            CompressionMethod::Aaf,
        )),
        _ => Err(Error::BadMagic),
    }
}
