//! DDS headers, in both their legacy (DX9) and extended (DX10) forms
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: "DDS "                                            |
//! | 0x0004         | Header                 | 124 bytes: size, flags, dimensions, mip count, ...         |
//! | 0x004C         | Pixel format           | 32 bytes: flags, fourCC, bit count and channel masks       |
//! | 0x006C         | Caps                   | 16 bytes: surface and cubemap flags                        |
//! | 0x0080         | DX10 header            | 20 bytes, only when the fourCC is "DX10"                   |
//!
//! Surfaces follow the header: every array element (or cubemap face) in turn,
//! each with its whole mip chain from largest to smallest.

use binrw::{BinRead, BinWrite};

use self::pixel_flags::{ALPHA, ALPHA_PIXELS, LUMINANCE, RGB};
use crate::error::{Error, Result};
use crate::format::DxgiFormat;

/// Header flags
pub mod flags {
    /// `caps` is valid
    pub const CAPS: u32 = 0x1;
    /// `height` is valid
    pub const HEIGHT: u32 = 0x2;
    /// `width` is valid
    pub const WIDTH: u32 = 0x4;
    /// `pitch_or_linear_size` holds the row pitch
    pub const PITCH: u32 = 0x8;
    /// `pixel_format` is valid
    pub const PIXEL_FORMAT: u32 = 0x1000;
    /// `mip_map_count` is valid
    pub const MIPMAP_COUNT: u32 = 0x20000;
    /// `pitch_or_linear_size` holds the size of the top level
    pub const LINEAR_SIZE: u32 = 0x80000;
}

/// Pixel format flags
pub mod pixel_flags {
    /// Color data with an alpha channel
    pub const ALPHA_PIXELS: u32 = 0x1;
    /// Alpha only
    pub const ALPHA: u32 = 0x2;
    /// `four_cc` names the format
    pub const FOUR_CC: u32 = 0x4;
    /// Uncompressed RGB described by the masks
    pub const RGB: u32 = 0x40;
    /// Single channel described by `r_mask`
    pub const LUMINANCE: u32 = 0x20000;
}

/// Surface capability flags
pub mod caps {
    /// More than one surface
    pub const COMPLEX: u32 = 0x8;
    /// Required on every texture
    pub const TEXTURE: u32 = 0x1000;
    /// Has mips
    pub const MIPMAP: u32 = 0x400000;

    /// `caps2`: cubemap
    pub const CUBEMAP: u32 = 0x200;
    /// `caps2`: +X, -X, +Y, -Y, +Z and -Z face bits
    pub const CUBEMAP_ALL_FACES: u32 = 0xFC00;
    /// `caps2`: volume texture
    pub const VOLUME: u32 = 0x200000;
}

const DX10_FOUR_CC: [u8; 4] = *b"DX10";
const DIMENSION_TEXTURE2D: u32 = 3;
const MISC_TEXTURE_CUBE: u32 = 0x4;

/// DDS pixel format block
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct PixelFormat {
    /// Always `32`
    pub size: u32,
    /// See [`pixel_flags`]
    pub flags: u32,
    pub four_cc: [u8; 4],
    /// Bits per pixel of uncompressed formats
    pub rgb_bit_count: u32,
    pub r_mask: u32,
    pub g_mask: u32,
    pub b_mask: u32,
    pub a_mask: u32,
}

impl PixelFormat {
    const fn four_cc(code: [u8; 4]) -> Self {
        Self {
            size: 32,
            flags: pixel_flags::FOUR_CC,
            four_cc: code,
            rgb_bit_count: 0,
            r_mask: 0,
            g_mask: 0,
            b_mask: 0,
            a_mask: 0,
        }
    }

    const fn masks(flags: u32, bits: u32, r: u32, g: u32, b: u32, a: u32) -> Self {
        Self {
            size: 32,
            flags,
            four_cc: [0; 4],
            rgb_bit_count: bits,
            r_mask: r,
            g_mask: g,
            b_mask: b,
            a_mask: a,
        }
    }

    /// Whether `self` describes the same legacy format as `other`
    fn matches(&self, other: &PixelFormat) -> bool {
        if other.flags & pixel_flags::FOUR_CC != 0 {
            return self.flags & pixel_flags::FOUR_CC != 0 && self.four_cc == other.four_cc;
        }

        const KIND: u32 = pixel_flags::RGB | pixel_flags::LUMINANCE | pixel_flags::ALPHA;

        self.flags & pixel_flags::FOUR_CC == 0
            && self.flags & KIND == other.flags & KIND
            && self.rgb_bit_count == other.rgb_bit_count
            && self.r_mask == other.r_mask
            && self.g_mask == other.g_mask
            && self.b_mask == other.b_mask
            && (other.a_mask == 0 || self.a_mask == other.a_mask)
    }
}

/// Extended header present when the pixel format's fourCC is `DX10`
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct Dx10Header {
    /// See [`DxgiFormat`]
    pub dxgi_format: u32,
    /// `3` for 2D textures
    pub resource_dimension: u32,
    /// `0x4` marks a cubemap
    pub misc_flag: u32,
    /// Array elements, whole cubes for cubemaps
    pub array_size: u32,
    pub misc_flags2: u32,
}

/// Legacy formats a DXGI format can be written as
///
/// Entries marked unconventional change how a channel is labelled (two
/// channel formats become luminance and alpha) or drop the sRGB tag.
const LEGACY_FORMATS: &[(DxgiFormat, PixelFormat, bool)] = &[
    (DxgiFormat::BC1_UNORM, PixelFormat::four_cc(*b"DXT1"), false),
    (DxgiFormat::BC2_UNORM, PixelFormat::four_cc(*b"DXT3"), false),
    (DxgiFormat::BC3_UNORM, PixelFormat::four_cc(*b"DXT5"), false),
    (DxgiFormat::BC4_UNORM, PixelFormat::four_cc(*b"ATI1"), false),
    (DxgiFormat::BC4_SNORM, PixelFormat::four_cc(*b"BC4S"), false),
    (DxgiFormat::BC5_UNORM, PixelFormat::four_cc(*b"ATI2"), false),
    (DxgiFormat::BC5_SNORM, PixelFormat::four_cc(*b"BC5S"), false),
    (DxgiFormat::R16G16B16A16_UNORM, PixelFormat::four_cc(36u32.to_le_bytes()), false),
    (DxgiFormat::R16G16B16A16_SNORM, PixelFormat::four_cc(110u32.to_le_bytes()), false),
    (DxgiFormat::R16_FLOAT, PixelFormat::four_cc(111u32.to_le_bytes()), false),
    (DxgiFormat::R16G16_FLOAT, PixelFormat::four_cc(112u32.to_le_bytes()), false),
    (DxgiFormat::R16G16B16A16_FLOAT, PixelFormat::four_cc(113u32.to_le_bytes()), false),
    (DxgiFormat::R32_FLOAT, PixelFormat::four_cc(114u32.to_le_bytes()), false),
    (DxgiFormat::R32G32_FLOAT, PixelFormat::four_cc(115u32.to_le_bytes()), false),
    (DxgiFormat::R32G32B32A32_FLOAT, PixelFormat::four_cc(116u32.to_le_bytes()), false),
    (
        DxgiFormat::R8G8B8A8_UNORM,
        PixelFormat::masks(RGB | ALPHA_PIXELS, 32, 0xFF, 0xFF00, 0xFF0000, 0xFF000000),
        false,
    ),
    (
        DxgiFormat::B8G8R8A8_UNORM,
        PixelFormat::masks(RGB | ALPHA_PIXELS, 32, 0xFF0000, 0xFF00, 0xFF, 0xFF000000),
        false,
    ),
    (
        DxgiFormat::B8G8R8X8_UNORM,
        PixelFormat::masks(RGB, 32, 0xFF0000, 0xFF00, 0xFF, 0),
        false,
    ),
    (
        DxgiFormat::R10G10B10A2_UNORM,
        PixelFormat::masks(RGB | ALPHA_PIXELS, 32, 0x3FF, 0xFFC00, 0x3FF00000, 0xC0000000),
        false,
    ),
    (
        DxgiFormat::R16G16_UNORM,
        PixelFormat::masks(RGB, 32, 0xFFFF, 0xFFFF0000, 0, 0),
        false,
    ),
    (
        DxgiFormat::B5G6R5_UNORM,
        PixelFormat::masks(RGB, 16, 0xF800, 0x7E0, 0x1F, 0),
        false,
    ),
    (
        DxgiFormat::B5G5R5A1_UNORM,
        PixelFormat::masks(RGB | ALPHA_PIXELS, 16, 0x7C00, 0x3E0, 0x1F, 0x8000),
        false,
    ),
    (
        DxgiFormat::B4G4R4A4_UNORM,
        PixelFormat::masks(RGB | ALPHA_PIXELS, 16, 0xF00, 0xF0, 0xF, 0xF000),
        false,
    ),
    (
        DxgiFormat::A8_UNORM,
        PixelFormat::masks(ALPHA, 8, 0, 0, 0, 0xFF),
        false,
    ),
    (
        DxgiFormat::R8G8_UNORM,
        PixelFormat::masks(LUMINANCE | ALPHA_PIXELS, 16, 0xFF, 0, 0, 0xFF00),
        true,
    ),
    (
        DxgiFormat::R8_UNORM,
        PixelFormat::masks(LUMINANCE, 8, 0xFF, 0, 0, 0),
        true,
    ),
    (
        DxgiFormat::R16_UNORM,
        PixelFormat::masks(LUMINANCE, 16, 0xFFFF, 0, 0, 0),
        true,
    ),
];

/// Legacy pixel format for `format`, if it has one.
///
/// sRGB formats and the luminance substitutions are only used when `force` is set.
pub fn legacy_pixel_format(format: DxgiFormat, force: bool) -> Option<PixelFormat> {
    let (format, srgb) = match format.without_srgb() {
        Some(linear) => (linear, true),
        None => (format, false),
    };

    if srgb && !force {
        return None;
    }

    LEGACY_FORMATS
        .iter()
        .find(|(candidate, _, unconventional)| *candidate == format && (force || !unconventional))
        .map(|(_, pixel_format, _)| *pixel_format)
}

/// DXGI format described by a legacy pixel format, if any.
pub fn format_from_legacy(pixel_format: &PixelFormat) -> Option<DxgiFormat> {
    const ALIASES: &[([u8; 4], DxgiFormat)] = &[
        (*b"DXT2", DxgiFormat::BC2_UNORM),
        (*b"DXT4", DxgiFormat::BC3_UNORM),
        (*b"BC4U", DxgiFormat::BC4_UNORM),
        (*b"BC5U", DxgiFormat::BC5_UNORM),
    ];

    if pixel_format.flags & pixel_flags::FOUR_CC != 0 {
        if let Some((_, format)) = ALIASES.iter().find(|(cc, _)| *cc == pixel_format.four_cc) {
            return Some(*format);
        }
    }

    LEGACY_FORMATS
        .iter()
        .find(|(_, candidate, _)| pixel_format.matches(candidate))
        .map(|(format, _, _)| *format)
}

/// A DDS file header
#[derive(BinRead, BinWrite, Debug, Clone, PartialEq, Eq)]
#[brw(little, magic = b"DDS ")]
pub struct DdsHeader {
    /// Always `124`
    pub size: u32,
    /// See [`flags`]
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    /// Row pitch or top level size, see [`DxgiFormat::pitch_or_linear_size`]
    pub pitch_or_linear_size: u32,
    /// Depth of volume textures
    pub depth: u32,
    /// Mips per element
    pub mip_map_count: u32,
    pub reserved1: [u32; 11],
    pub pixel_format: PixelFormat,
    /// See [`caps`]
    pub caps: u32,
    /// Cubemap and volume bits of [`caps`]
    pub caps2: u32,
    pub caps3: u32,
    pub caps4: u32,
    pub reserved2: u32,

    /// Present when the fourCC is `DX10`
    #[br(if(pixel_format.four_cc == DX10_FOUR_CC))]
    pub dx10: Option<Dx10Header>,
}

impl DdsHeader {
    /// Size of a legacy header, magic included
    pub const LEGACY_SIZE: usize = 128;

    /// Size of an extended header, magic included
    pub const DX10_SIZE: usize = 148;

    /// Extended header describing a 2D texture, a texture array or a cubemap.
    ///
    /// `array_size` counts whole cubes for cubemaps.
    pub fn new(
        format: DxgiFormat,
        width: u32,
        height: u32,
        mip_count: u32,
        array_size: u32,
        cubemap: bool,
    ) -> Self {
        let mip_count = mip_count.max(1);

        let mut header_flags = flags::CAPS | flags::HEIGHT | flags::WIDTH | flags::PIXEL_FORMAT;
        header_flags |= flags::MIPMAP_COUNT;
        header_flags |= if format.is_block_compressed() {
            flags::LINEAR_SIZE
        } else {
            flags::PITCH
        };

        let mut surface_caps = caps::TEXTURE;
        if mip_count > 1 || cubemap {
            surface_caps |= caps::COMPLEX;
        }
        if mip_count > 1 {
            surface_caps |= caps::MIPMAP;
        }

        Self {
            size: 124,
            flags: header_flags,
            height,
            width,
            pitch_or_linear_size: format.pitch_or_linear_size(width, height).unwrap_or(0),
            depth: 0,
            mip_map_count: mip_count,
            reserved1: [0; 11],
            pixel_format: PixelFormat::four_cc(DX10_FOUR_CC),
            caps: surface_caps,
            caps2: if cubemap {
                caps::CUBEMAP | caps::CUBEMAP_ALL_FACES
            } else {
                0
            },
            caps3: 0,
            caps4: 0,
            reserved2: 0,
            dx10: Some(Dx10Header {
                dxgi_format: format.0,
                resource_dimension: DIMENSION_TEXTURE2D,
                misc_flag: if cubemap { MISC_TEXTURE_CUBE } else { 0 },
                array_size: array_size.max(1),
                misc_flags2: 0,
            }),
        }
    }

    /// Replace the extended header with a legacy pixel format.
    ///
    /// Only single textures can be downgraded. Returns whether the header was
    /// changed.
    pub fn downgrade_to_legacy(&mut self, force: bool) -> bool {
        let Some(dx10) = self.dx10 else {
            return true;
        };

        if dx10.array_size > 1 {
            return false;
        }

        match legacy_pixel_format(DxgiFormat(dx10.dxgi_format), force) {
            Some(pixel_format) => {
                self.pixel_format = pixel_format;
                self.dx10 = None;
                true
            }
            None => false,
        }
    }

    /// Size of the header as written
    pub fn header_size(&self) -> usize {
        match self.dx10 {
            Some(_) => Self::DX10_SIZE,
            None => Self::LEGACY_SIZE,
        }
    }

    /// Pixel format of the surfaces
    pub fn format(&self) -> Result<DxgiFormat> {
        match self.dx10 {
            Some(dx10) => Ok(DxgiFormat(dx10.dxgi_format)),
            None => format_from_legacy(&self.pixel_format).ok_or_else(|| {
                Error::UnsupportedFormat(format!(
                    "legacy pixel format {:?} has no DXGI equivalent",
                    self.pixel_format
                ))
            }),
        }
    }

    /// Whether the texture is a cubemap
    pub fn is_cubemap(&self) -> bool {
        self.caps2 & caps::CUBEMAP != 0
    }

    /// Whether a cubemap defines all six faces
    pub fn has_all_faces(&self) -> bool {
        self.caps2 & caps::CUBEMAP_ALL_FACES == caps::CUBEMAP_ALL_FACES
    }

    /// Whether the texture is a volume
    pub fn is_volume(&self) -> bool {
        self.caps2 & caps::VOLUME != 0
    }

    /// Number of array elements, whole cubes for cubemaps
    pub fn array_size(&self) -> u32 {
        self.dx10.map(|d| d.array_size.max(1)).unwrap_or(1)
    }

    /// Number of images per mip level, six per cube
    pub fn element_count(&self) -> u32 {
        self.array_size() * if self.is_cubemap() { 6 } else { 1 }
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::{BinRead, BinWrite};
    use pretty_assertions::assert_eq;

    use crate::dds::{caps, flags, format_from_legacy, legacy_pixel_format, pixel_flags, DdsHeader};
    use crate::error::Result;
    use crate::format::DxgiFormat;

    #[test]
    fn write_dx10_header() -> Result<()> {
        let header = DdsHeader::new(DxgiFormat::BC7_UNORM, 256, 128, 9, 1, false);

        let mut actual = Cursor::new(Vec::new());
        header.write(&mut actual)?;
        let actual = actual.into_inner();

        assert_eq!(actual.len(), DdsHeader::DX10_SIZE);
        assert_eq!(&actual[..8], b"DDS |\0\0\0");
        assert_eq!(&actual[84..88], b"DX10");
        assert_eq!(&actual[128..132], &[98, 0, 0, 0]);

        assert_eq!(header.pitch_or_linear_size, 64 * 32 * 16);
        assert_eq!(
            header.flags,
            flags::CAPS
                | flags::HEIGHT
                | flags::WIDTH
                | flags::PIXEL_FORMAT
                | flags::MIPMAP_COUNT
                | flags::LINEAR_SIZE
        );
        assert_eq!(header.caps, caps::TEXTURE | caps::COMPLEX | caps::MIPMAP);

        let read = DdsHeader::read(&mut Cursor::new(actual))?;
        assert_eq!(read, header);

        Ok(())
    }

    #[test]
    fn legacy_header_has_no_extension() -> Result<()> {
        let mut header = DdsHeader::new(DxgiFormat::BC1_UNORM, 64, 64, 7, 1, false);
        assert!(header.downgrade_to_legacy(false));

        let mut actual = Cursor::new(Vec::new());
        header.write(&mut actual)?;
        let actual = actual.into_inner();

        assert_eq!(actual.len(), DdsHeader::LEGACY_SIZE);
        assert_eq!(&actual[84..88], b"DXT1");

        let read = DdsHeader::read(&mut Cursor::new(actual))?;
        assert_eq!(read.dx10, None);
        assert_eq!(read.format()?, DxgiFormat::BC1_UNORM);

        Ok(())
    }

    #[test]
    fn two_channel_becomes_luminance_alpha() {
        let pixel_format = legacy_pixel_format(DxgiFormat::R8G8_UNORM, true);
        let pixel_format = pixel_format.map(|p| (p.flags, p.rgb_bit_count, p.r_mask, p.a_mask));

        assert_eq!(
            pixel_format,
            Some((pixel_flags::LUMINANCE | pixel_flags::ALPHA_PIXELS, 16, 0xFF, 0xFF00))
        );
        assert_eq!(legacy_pixel_format(DxgiFormat::R8G8_UNORM, false), None);
    }

    #[test]
    fn srgb_needs_force() {
        assert_eq!(legacy_pixel_format(DxgiFormat::BC3_UNORM_SRGB, false), None);
        assert_eq!(
            legacy_pixel_format(DxgiFormat::BC3_UNORM_SRGB, true).map(|p| p.four_cc),
            Some(*b"DXT5")
        );
    }

    #[test]
    fn arrays_stay_extended() {
        let mut header = DdsHeader::new(DxgiFormat::BC1_UNORM, 64, 64, 7, 2, false);
        assert!(!header.downgrade_to_legacy(true));
        assert!(header.dx10.is_some());
    }

    #[test]
    fn legacy_lookup() {
        for format in [
            DxgiFormat::BC1_UNORM,
            DxgiFormat::BC5_UNORM,
            DxgiFormat::B8G8R8A8_UNORM,
            DxgiFormat::R8G8_UNORM,
            DxgiFormat::R16G16B16A16_FLOAT,
        ] {
            let pixel_format = legacy_pixel_format(format, true);
            assert_eq!(pixel_format.and_then(|p| format_from_legacy(&p)), Some(format));
        }

        let mut dxt2 = legacy_pixel_format(DxgiFormat::BC2_UNORM, false);
        if let Some(p) = dxt2.as_mut() {
            p.four_cc = *b"DXT2";
        }
        assert_eq!(dxt2.and_then(|p| format_from_legacy(&p)), Some(DxgiFormat::BC2_UNORM));
    }

    #[test]
    fn cubemap_flags() {
        let header = DdsHeader::new(DxgiFormat::BC1_UNORM, 64, 64, 7, 1, true);
        assert!(header.is_cubemap());
        assert!(header.has_all_faces());
        assert_eq!(header.caps2, 0xFE00);
        assert_eq!(header.element_count(), 6);
    }
}
