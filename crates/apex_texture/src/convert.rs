//! Conversion between AVTX textures and DDS files.

use std::fs::{self, File};
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use binrw::{BinRead, BinWrite};
use bon::Builder;
use tracing::{debug, info, instrument, warn};

use crate::avtx::{
    flags, AvtxEntry, AvtxHeader, AvtxTexture, FsSidecars, Sidecar, SidecarStore, ENTRY_COUNT,
};
use crate::dds::DdsHeader;
use crate::error::{Error, Result};
use crate::format::{mip_dimension, DxgiFormat};

/// Highest number of sidecar levels
pub const MAX_LEVELS: u8 = 3;

/// Options for both conversion directions
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Write legacy DDS headers when the format allows it
    #[builder(default = true)]
    pub convert_to_legacy: bool,

    /// Allow legacy formats that relabel channels or drop sRGB
    #[builder(default = true)]
    pub force_unconventional: bool,

    /// Store streamed mips in a single `.hmddsc` instead of `.atxN` files
    #[builder(default)]
    pub use_hmddsc: bool,

    /// Mark created textures as non tiling
    #[builder(default = true)]
    pub no_tiling: bool,

    /// Only write the largest mip when converting to DDS
    #[builder(default)]
    pub extract_largest_mip: bool,

    /// Number of sidecar levels to stream mips into
    #[builder(default = 2)]
    pub atx_levels: u8,

    /// Largest dimension a mip may have to stay in level 0, 1 and 2
    #[builder(default = [256, 1024, 2048])]
    pub level_max_resolution: [u32; 3],
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConvertOptions {
    /// Number of sidecar levels actually used
    pub fn levels(&self) -> u8 {
        let levels = self.atx_levels.min(MAX_LEVELS);
        if self.use_hmddsc {
            levels.min(1)
        } else {
            levels
        }
    }

    /// Largest dimension allowed in `level`, unbounded past the last one
    fn ceiling(&self, level: u8) -> u32 {
        if level < self.levels() {
            self.level_max_resolution
                .get(usize::from(level))
                .copied()
                .unwrap_or(u32::MAX)
        } else {
            u32::MAX
        }
    }

    fn sidecar(&self, level: u16) -> Sidecar {
        if self.use_hmddsc {
            Sidecar::Hmddsc
        } else {
            Sidecar::Atx(level)
        }
    }
}

/// Non fatal problem met while converting, output is still produced
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionWarning {
    #[error("cubemap detected, largest mip extraction ignored")]
    LargestMipIgnoredForCubemap,

    #[error("texture uses arrays, largest mip extraction ignored")]
    LargestMipIgnoredForArray,

    #[error("{0} has no known layout, largest mip extraction ignored")]
    LargestMipIgnoredForFormat(DxgiFormat),

    #[error("couldn't convert DX10 header of {0} to legacy")]
    LegacyDowngradeSkipped(DxgiFormat),

    #[error("{0} sidecar levels requested, using {1}")]
    LevelsClamped(u8, u8),
}

/// A DDS file made from an AVTX texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DdsOutput {
    /// Header and every surface, ready to be written as a `.dds`
    pub data: Vec<u8>,
    pub warnings: Vec<ConversionWarning>,
}

/// An AVTX texture made from a DDS file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvtxOutput {
    /// Header written at the start of `main`
    pub header: AvtxHeader,

    /// Contents of the `.ddsc` file
    pub main: Vec<u8>,

    /// Sidecar files in level order
    pub sidecars: Vec<(Sidecar, Vec<u8>)>,

    /// Problems that did not stop the conversion
    pub warnings: Vec<ConversionWarning>,
}

/// Files written by a conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertReport {
    /// Every file written, main file first
    pub outputs: Vec<PathBuf>,
    pub warnings: Vec<ConversionWarning>,
}

fn warn_all(warnings: &[ConversionWarning]) {
    for warning in warnings {
        warn!("{warning}");
    }
}

/// Start of every surface in both layouts, as
/// `(mip major offset, element major offset, size)`.
///
/// Element major is the DDS order: each element with its whole mip chain.
/// Mip major is how AVTX stores cubemaps: each mip for every element.
fn surface_offsets(sizes: &[u32], elements: usize) -> Vec<(usize, usize, usize)> {
    let chain: usize = sizes.iter().map(|&s| s as usize).sum();
    let mut offsets = Vec::with_capacity(sizes.len() * elements);

    let mut mip_start = 0;
    let mut in_chain = 0;
    for &size in sizes {
        let size = size as usize;
        for element in 0..elements {
            offsets.push((mip_start + element * size, element * chain + in_chain, size));
        }
        mip_start += size * elements;
        in_chain += size;
    }

    offsets
}

/// Bytes taken by `elements` full mip chains, [`None`] on overflow
fn chains_size(sizes: &[u32], elements: usize) -> Option<usize> {
    sizes
        .iter()
        .try_fold(0usize, |sum, &size| sum.checked_add(size as usize))?
        .checked_mul(elements)
}

fn reorder(data: &[u8], sizes: &[u32], elements: usize, to_mip_major: bool) -> Result<Vec<u8>> {
    let total = chains_size(sizes, elements).ok_or(Error::Truncated)?;
    if data.len() < total {
        return Err(Error::Truncated);
    }

    let mut out = vec![0; total];
    for (mip_major, element_major, size) in surface_offsets(sizes, elements) {
        let (from, to) = if to_mip_major {
            (element_major, mip_major)
        } else {
            (mip_major, element_major)
        };
        out[to..to + size].copy_from_slice(&data[from..from + size]);
    }

    Ok(out)
}

/// Convert an AVTX texture into a DDS file.
#[instrument(skip_all, err)]
pub fn avtx_to_dds<R: Read + Seek, S: SidecarStore>(
    reader: &mut R,
    sidecars: &S,
    options: &ConvertOptions,
) -> Result<DdsOutput> {
    let texture = AvtxTexture::read(reader, sidecars)?;
    let header = &texture.header;
    let mut warnings = Vec::new();

    let format = header.dxgi_format();
    let width = u32::from(header.width);
    let height = u32::from(header.height);
    let array_size = u32::from(header.array_size.max(1));
    let mip_count = u32::from(header.mip_count.max(1));
    let cubemap = header.is_cubemap();

    let mut largest_only = options.extract_largest_mip;
    if largest_only && cubemap {
        largest_only = false;
        warnings.push(ConversionWarning::LargestMipIgnoredForCubemap);
    }
    if largest_only && array_size > 1 {
        largest_only = false;
        warnings.push(ConversionWarning::LargestMipIgnoredForArray);
    }

    let largest = format.surface_size(width, height);
    if largest_only && largest.is_none() {
        largest_only = false;
        warnings.push(ConversionWarning::LargestMipIgnoredForFormat(format));
    }

    let mut dds = DdsHeader::new(
        format,
        width,
        height,
        if largest_only { 1 } else { mip_count },
        array_size,
        cubemap,
    );

    if options.convert_to_legacy && !dds.downgrade_to_legacy(options.force_unconventional) {
        warnings.push(ConversionWarning::LegacyDowngradeSkipped(format));
    }

    let body = if cubemap {
        let sizes = format
            .mip_sizes(width, height, mip_count)
            .ok_or_else(|| Error::unsupported_format(format))?;
        reorder(&texture.data, &sizes, array_size as usize * 6, false)?
    } else if let (true, Some(size)) = (largest_only, largest) {
        texture
            .data
            .get(..size as usize)
            .ok_or(Error::Truncated)?
            .to_vec()
    } else {
        texture.data
    };

    let mut data = Cursor::new(Vec::with_capacity(dds.header_size() + body.len()));
    dds.write(&mut data)?;
    let mut data = data.into_inner();
    data.extend_from_slice(&body);

    warn_all(&warnings);
    debug!("wrote {} byte DDS", data.len());

    Ok(DdsOutput { data, warnings })
}

/// Convert a DDS file into an AVTX texture and its sidecars.
#[instrument(skip_all, err)]
pub fn dds_to_avtx<R: Read + Seek>(reader: &mut R, options: &ConvertOptions) -> Result<AvtxOutput> {
    let dds = DdsHeader::read(reader)?;
    let mut warnings = Vec::new();

    if dds.is_volume() {
        return Err(Error::UnsupportedFormat(
            "volume textures are not supported".to_string(),
        ));
    }

    let cubemap = dds.is_cubemap();
    if cubemap && !dds.has_all_faces() {
        return Err(Error::IncompleteCubemap);
    }

    let format = dds.format()?;

    if dds.mip_map_count < 2 {
        return Err(Error::MissingMipmaps);
    }

    let sizes = format
        .mip_sizes(dds.width, dds.height, dds.mip_map_count)
        .ok_or_else(|| Error::unsupported_format(format))?;
    let elements = dds.element_count() as usize;
    let total = chains_size(&sizes, elements).ok_or_else(|| Error::unsupported_format(format))?;
    if total == 0 {
        return Err(Error::unsupported_format(format));
    }

    let dimension_error = || {
        Error::UnsupportedFormat(format!(
            "{}x{} with {} mips and {} elements does not fit an AVTX header",
            dds.width,
            dds.height,
            dds.mip_map_count,
            dds.array_size()
        ))
    };

    let total_size = u32::try_from(total).map_err(|_| dimension_error())?;

    let mut buffer = Vec::new();
    reader
        .by_ref()
        .take(u64::from(total_size))
        .read_to_end(&mut buffer)?;
    if buffer.len() != total {
        return Err(Error::Truncated);
    }

    let array_size = dds.array_size();
    let mut header = AvtxHeader {
        format: format.0,
        width: u16::try_from(dds.width).map_err(|_| dimension_error())?,
        height: u16::try_from(dds.height).map_err(|_| dimension_error())?,
        array_size: u16::try_from(array_size).map_err(|_| dimension_error())?,
        mip_count: u8::try_from(dds.mip_map_count).map_err(|_| dimension_error())?,
        ..Default::default()
    };

    if options.atx_levels != options.levels() {
        warnings.push(ConversionWarning::LevelsClamped(
            options.atx_levels,
            options.levels(),
        ));
    }
    let levels = options.levels();

    let external = array_size == 1 && levels > 0 && !cubemap;
    header.set_flag(flags::EXTERNAL_BUFFERS, external);
    header.set_flag(flags::NO_TILING, options.no_tiling);
    header.set_flag(flags::CUBEMAP, cubemap);

    let mut sidecars = Vec::new();
    let inline = if !external {
        header.header_mip_count = header.mip_count;
        header.entries[0] = AvtxEntry::new(AvtxHeader::SIZE, total_size, 0);

        if cubemap {
            reorder(&buffer, &sizes, elements, true)?
        } else {
            buffer
        }
    } else {
        let mut offsets = Vec::with_capacity(sizes.len());
        let mut offset = 0;
        for &size in &sizes {
            offsets.push(offset);
            offset += size as usize;
        }

        // walk from the smallest mip up, moving to the next level whenever a
        // mip outgrows the current one
        let mut level = 0u8;
        let mut assigned = vec![0u8; sizes.len()];
        for mip in (0..sizes.len()).rev() {
            let mip_index = mip as u32;
            let dimension =
                mip_dimension(dds.width, mip_index).max(mip_dimension(dds.height, mip_index));
            while dimension > options.ceiling(level) {
                level += 1;
            }
            assigned[mip] = level;
        }

        let streamed = assigned.iter().filter(|&&l| l > 0).count();
        if streamed > ENTRY_COUNT - 1 {
            return Err(Error::TooManyStreamedMips(streamed));
        }

        let mut entry = 1;
        let mut current: Option<(u16, Vec<u8>)> = None;
        for mip in (0..sizes.len()).rev().filter(|&m| assigned[m] > 0) {
            let level = u16::from(assigned[mip]);
            let data = &buffer[offsets[mip]..offsets[mip] + sizes[mip] as usize];

            match current.as_mut() {
                Some((current_level, file)) if *current_level == level => {
                    header.entries[entry] = AvtxEntry::new(file.len() as u32, sizes[mip], level);
                    file.extend_from_slice(data);
                }
                _ => {
                    if let Some((done, file)) = current.take() {
                        sidecars.push((options.sidecar(done), file));
                    }
                    header.entries[entry] = AvtxEntry::new(0, sizes[mip], level);
                    current = Some((level, data.to_vec()));
                }
            }
            entry += 1;
        }
        if let Some((done, file)) = current {
            sidecars.push((options.sidecar(done), file));
        }

        let inline_start = (0..sizes.len())
            .find(|&m| assigned[m] == 0)
            .map(|m| offsets[m])
            .unwrap_or(total);
        let inline = buffer[inline_start..].to_vec();

        header.header_mip_count = assigned.iter().filter(|&&l| l == 0).count() as u8;
        header.entries[0] = AvtxEntry::new(AvtxHeader::SIZE, inline.len() as u32, 0);

        debug!(
            "{} mips inline, {} streamed over {} sidecars",
            header.header_mip_count,
            streamed,
            sidecars.len()
        );

        inline
    };

    let mut main = Cursor::new(Vec::with_capacity(AvtxHeader::SIZE as usize + inline.len()));
    AvtxTexture::write_header(&header, &inline, &mut main)?;

    warn_all(&warnings);

    Ok(AvtxOutput {
        header,
        main: main.into_inner(),
        sidecars,
        warnings,
    })
}

/// Convert the `.ddsc` at `path` into a `.dds` next to it.
#[instrument(skip(options), err)]
pub fn convert_avtx_file(path: &Path, options: &ConvertOptions) -> Result<ConvertReport> {
    let mut reader = BufReader::new(File::open(path)?);
    let output = avtx_to_dds(&mut reader, &FsSidecars::for_texture(path), options)?;

    let target = path.with_extension("dds");
    fs::write(&target, &output.data)?;
    info!("wrote {}", target.display());

    Ok(ConvertReport {
        outputs: vec![target],
        warnings: output.warnings,
    })
}

/// Convert the `.dds` at `path` into a `.ddsc` and its sidecars next to it.
#[instrument(skip(options), err)]
pub fn convert_dds_file(path: &Path, options: &ConvertOptions) -> Result<ConvertReport> {
    let mut reader = BufReader::new(File::open(path)?);
    let output = dds_to_avtx(&mut reader, options)?;

    let target = path.with_extension("ddsc");
    fs::write(&target, &output.main)?;

    let mut outputs = vec![target];
    outputs.extend(FsSidecars::for_texture(path).write_all(&output.sidecars)?);

    for written in &outputs {
        info!("wrote {}", written.display());
    }

    Ok(ConvertReport {
        outputs,
        warnings: output.warnings,
    })
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::convert::{chains_size, reorder, surface_offsets, ConvertOptions};
    use crate::error::Result;

    #[test]
    fn default_options() {
        let options = ConvertOptions::default();
        assert!(options.convert_to_legacy);
        assert!(options.no_tiling);
        assert!(!options.use_hmddsc);
        assert_eq!(options.atx_levels, 2);
        assert_eq!(options.level_max_resolution, [256, 1024, 2048]);
    }

    #[test]
    fn levels_are_clamped() {
        let options = ConvertOptions::builder().atx_levels(7).build();
        assert_eq!(options.levels(), 3);

        let options = ConvertOptions::builder().atx_levels(3).use_hmddsc(true).build();
        assert_eq!(options.levels(), 1);
    }

    #[test]
    fn ceilings() {
        let options = ConvertOptions::default();
        assert_eq!(options.ceiling(0), 256);
        assert_eq!(options.ceiling(1), 1024);
        assert_eq!(options.ceiling(2), u32::MAX);
    }

    #[test]
    fn offsets_of_two_elements() {
        assert_eq!(
            surface_offsets(&[4, 1], 2),
            vec![(0, 0, 4), (4, 5, 4), (8, 4, 1), (9, 9, 1)]
        );
    }

    #[test]
    fn chain_size_overflow() {
        assert_eq!(chains_size(&[16, 4, 1], 6), Some(126));
        assert_eq!(chains_size(&[u32::MAX, u32::MAX], usize::MAX), None);
    }

    #[test]
    fn reorder_both_ways() -> Result<()> {
        #[rustfmt::skip]
        let element_major = vec![
            0xA0, 0xA0, 0xA0, 0xA0, 0xA1,
            0xB0, 0xB0, 0xB0, 0xB0, 0xB1,
        ];
        #[rustfmt::skip]
        let mip_major = vec![
            0xA0, 0xA0, 0xA0, 0xA0, 0xB0, 0xB0, 0xB0, 0xB0,
            0xA1, 0xB1,
        ];

        assert_eq!(reorder(&element_major, &[4, 1], 2, true)?, mip_major);
        assert_eq!(reorder(&mip_major, &[4, 1], 2, false)?, element_major);

        Ok(())
    }
}
