//! DXGI pixel formats and their memory layout.

use std::fmt;

/// A `DXGI_FORMAT` value
///
/// Kept as the raw value since textures may carry formats this crate has no
/// layout for. Those can still be passed through, just not resized.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct DxgiFormat(pub u32);

/// How pixels of a format are stored
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FormatLayout {
    /// 4x4 pixel blocks of the given size in bytes
    Block(u32),
    /// Individual pixels of the given size in bits
    Bits(u32),
}

#[allow(missing_docs)]
impl DxgiFormat {
    pub const UNKNOWN: Self = Self(0);
    pub const R32G32B32A32_TYPELESS: Self = Self(1);
    pub const R32G32B32A32_FLOAT: Self = Self(2);
    pub const R32G32B32A32_UINT: Self = Self(3);
    pub const R32G32B32A32_SINT: Self = Self(4);
    pub const R32G32B32_TYPELESS: Self = Self(5);
    pub const R32G32B32_FLOAT: Self = Self(6);
    pub const R32G32B32_UINT: Self = Self(7);
    pub const R32G32B32_SINT: Self = Self(8);
    pub const R16G16B16A16_TYPELESS: Self = Self(9);
    pub const R16G16B16A16_FLOAT: Self = Self(10);
    pub const R16G16B16A16_UNORM: Self = Self(11);
    pub const R16G16B16A16_UINT: Self = Self(12);
    pub const R16G16B16A16_SNORM: Self = Self(13);
    pub const R16G16B16A16_SINT: Self = Self(14);
    pub const R32G32_TYPELESS: Self = Self(15);
    pub const R32G32_FLOAT: Self = Self(16);
    pub const R32G32_UINT: Self = Self(17);
    pub const R32G32_SINT: Self = Self(18);
    pub const R10G10B10A2_TYPELESS: Self = Self(23);
    pub const R10G10B10A2_UNORM: Self = Self(24);
    pub const R10G10B10A2_UINT: Self = Self(25);
    pub const R11G11B10_FLOAT: Self = Self(26);
    pub const R8G8B8A8_TYPELESS: Self = Self(27);
    pub const R8G8B8A8_UNORM: Self = Self(28);
    pub const R8G8B8A8_UNORM_SRGB: Self = Self(29);
    pub const R8G8B8A8_UINT: Self = Self(30);
    pub const R8G8B8A8_SNORM: Self = Self(31);
    pub const R8G8B8A8_SINT: Self = Self(32);
    pub const R16G16_TYPELESS: Self = Self(33);
    pub const R16G16_FLOAT: Self = Self(34);
    pub const R16G16_UNORM: Self = Self(35);
    pub const R16G16_UINT: Self = Self(36);
    pub const R16G16_SNORM: Self = Self(37);
    pub const R16G16_SINT: Self = Self(38);
    pub const R32_TYPELESS: Self = Self(39);
    pub const D32_FLOAT: Self = Self(40);
    pub const R32_FLOAT: Self = Self(41);
    pub const R32_UINT: Self = Self(42);
    pub const R32_SINT: Self = Self(43);
    pub const R8G8_TYPELESS: Self = Self(48);
    pub const R8G8_UNORM: Self = Self(49);
    pub const R8G8_UINT: Self = Self(50);
    pub const R8G8_SNORM: Self = Self(51);
    pub const R8G8_SINT: Self = Self(52);
    pub const R16_TYPELESS: Self = Self(53);
    pub const R16_FLOAT: Self = Self(54);
    pub const D16_UNORM: Self = Self(55);
    pub const R16_UNORM: Self = Self(56);
    pub const R16_UINT: Self = Self(57);
    pub const R16_SNORM: Self = Self(58);
    pub const R16_SINT: Self = Self(59);
    pub const R8_TYPELESS: Self = Self(60);
    pub const R8_UNORM: Self = Self(61);
    pub const R8_UINT: Self = Self(62);
    pub const R8_SNORM: Self = Self(63);
    pub const R8_SINT: Self = Self(64);
    pub const A8_UNORM: Self = Self(65);
    pub const R9G9B9E5_SHAREDEXP: Self = Self(67);
    pub const BC1_TYPELESS: Self = Self(70);
    pub const BC1_UNORM: Self = Self(71);
    pub const BC1_UNORM_SRGB: Self = Self(72);
    pub const BC2_TYPELESS: Self = Self(73);
    pub const BC2_UNORM: Self = Self(74);
    pub const BC2_UNORM_SRGB: Self = Self(75);
    pub const BC3_TYPELESS: Self = Self(76);
    pub const BC3_UNORM: Self = Self(77);
    pub const BC3_UNORM_SRGB: Self = Self(78);
    pub const BC4_TYPELESS: Self = Self(79);
    pub const BC4_UNORM: Self = Self(80);
    pub const BC4_SNORM: Self = Self(81);
    pub const BC5_TYPELESS: Self = Self(82);
    pub const BC5_UNORM: Self = Self(83);
    pub const BC5_SNORM: Self = Self(84);
    pub const B5G6R5_UNORM: Self = Self(85);
    pub const B5G5R5A1_UNORM: Self = Self(86);
    pub const B8G8R8A8_UNORM: Self = Self(87);
    pub const B8G8R8X8_UNORM: Self = Self(88);
    pub const B8G8R8A8_TYPELESS: Self = Self(90);
    pub const B8G8R8A8_UNORM_SRGB: Self = Self(91);
    pub const B8G8R8X8_TYPELESS: Self = Self(92);
    pub const B8G8R8X8_UNORM_SRGB: Self = Self(93);
    pub const BC6H_TYPELESS: Self = Self(94);
    pub const BC6H_UF16: Self = Self(95);
    pub const BC6H_SF16: Self = Self(96);
    pub const BC7_TYPELESS: Self = Self(97);
    pub const BC7_UNORM: Self = Self(98);
    pub const BC7_UNORM_SRGB: Self = Self(99);
    pub const B4G4R4A4_UNORM: Self = Self(115);
}

impl DxgiFormat {
    /// Storage layout, [`None`] for formats without a simple one
    pub fn layout(&self) -> Option<FormatLayout> {
        let layout = match self.0 {
            1..=4 => FormatLayout::Bits(128),
            5..=8 => FormatLayout::Bits(96),
            9..=22 => FormatLayout::Bits(64),
            23..=47 | 67 => FormatLayout::Bits(32),
            48..=59 => FormatLayout::Bits(16),
            60..=65 => FormatLayout::Bits(8),
            66 => FormatLayout::Bits(1),
            70..=72 | 79..=81 => FormatLayout::Block(8),
            73..=78 | 82..=84 | 94..=99 => FormatLayout::Block(16),
            85 | 86 | 115 => FormatLayout::Bits(16),
            87..=93 => FormatLayout::Bits(32),
            _ => return None,
        };

        Some(layout)
    }

    /// Whether the format stores 4x4 pixel blocks
    pub fn is_block_compressed(&self) -> bool {
        matches!(self.layout(), Some(FormatLayout::Block(_)))
    }

    /// Linear counterpart of an sRGB format, [`None`] when not an sRGB format
    pub fn without_srgb(&self) -> Option<Self> {
        match *self {
            Self::R8G8B8A8_UNORM_SRGB => Some(Self::R8G8B8A8_UNORM),
            Self::BC1_UNORM_SRGB => Some(Self::BC1_UNORM),
            Self::BC2_UNORM_SRGB => Some(Self::BC2_UNORM),
            Self::BC3_UNORM_SRGB => Some(Self::BC3_UNORM),
            Self::B8G8R8A8_UNORM_SRGB => Some(Self::B8G8R8A8_UNORM),
            Self::B8G8R8X8_UNORM_SRGB => Some(Self::B8G8R8X8_UNORM),
            Self::BC7_UNORM_SRGB => Some(Self::BC7_UNORM),
            _ => None,
        }
    }

    /// Size in bytes of a single `width` x `height` image, [`None`] when the
    /// format has no known layout or the size does not fit in 32 bits
    pub fn surface_size(&self, width: u32, height: u32) -> Option<u32> {
        let width = width.max(1);
        let height = height.max(1);

        match self.layout()? {
            FormatLayout::Block(bytes) => width
                .div_ceil(4)
                .checked_mul(height.div_ceil(4))?
                .checked_mul(bytes),
            FormatLayout::Bits(bits) => row_size(width, bits)?.checked_mul(height),
        }
    }

    /// Row pitch for uncompressed formats, total size of the top level for
    /// block compressed ones, as DDS headers record it.
    pub fn pitch_or_linear_size(&self, width: u32, height: u32) -> Option<u32> {
        match self.layout()? {
            FormatLayout::Block(_) => self.surface_size(width, height),
            FormatLayout::Bits(bits) => row_size(width.max(1), bits),
        }
    }

    /// Sizes of every level of a mip chain, largest first
    pub fn mip_sizes(&self, width: u32, height: u32, mip_count: u32) -> Option<Vec<u32>> {
        (0..mip_count)
            .map(|mip| self.surface_size(mip_dimension(width, mip), mip_dimension(height, mip)))
            .collect()
    }
}

fn row_size(width: u32, bits: u32) -> Option<u32> {
    Some(width.checked_mul(bits)?.div_ceil(8))
}

/// Dimension of `mip` for a texture whose top level has dimension `size`
pub fn mip_dimension(size: u32, mip: u32) -> u32 {
    size.checked_shr(mip).unwrap_or(0).max(1)
}

impl fmt::Display for DxgiFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DXGI format {}", self.0)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::format::{mip_dimension, DxgiFormat, FormatLayout};

    #[test]
    fn layouts() {
        assert_eq!(DxgiFormat::BC1_UNORM.layout(), Some(FormatLayout::Block(8)));
        assert_eq!(DxgiFormat::BC7_UNORM.layout(), Some(FormatLayout::Block(16)));
        assert_eq!(DxgiFormat::R8G8_UNORM.layout(), Some(FormatLayout::Bits(16)));
        assert_eq!(DxgiFormat::R32G32B32A32_FLOAT.layout(), Some(FormatLayout::Bits(128)));
        assert_eq!(DxgiFormat::UNKNOWN.layout(), None);
        assert_eq!(DxgiFormat(200).layout(), None);
    }

    #[test]
    fn block_sizes_round_up() {
        assert_eq!(DxgiFormat::BC1_UNORM.surface_size(1, 1), Some(8));
        assert_eq!(DxgiFormat::BC1_UNORM.surface_size(5, 4), Some(16));
        assert_eq!(DxgiFormat::BC3_UNORM.surface_size(256, 128), Some(64 * 32 * 16));
    }

    #[test]
    fn mip_chain() {
        assert_eq!(
            DxgiFormat::R8G8B8A8_UNORM.mip_sizes(4, 2, 3),
            Some(vec![32, 8, 4])
        );
        assert_eq!(mip_dimension(4096, 12), 1);
        assert_eq!(mip_dimension(4096, 40), 1);
    }

    #[test]
    fn pitch() {
        assert_eq!(DxgiFormat::R8G8_UNORM.pitch_or_linear_size(10, 10), Some(20));
        assert_eq!(DxgiFormat::BC1_UNORM.pitch_or_linear_size(8, 8), Some(32));
    }

    #[test]
    fn oversized_surfaces_have_no_size() {
        assert_eq!(DxgiFormat::R8G8B8A8_UNORM.surface_size(u32::MAX, u32::MAX), None);
        assert_eq!(DxgiFormat::BC7_UNORM.surface_size(u32::MAX, u32::MAX), None);
        assert_eq!(DxgiFormat::R32G32B32A32_FLOAT.surface_size(65535, 65535), None);
        assert_eq!(
            DxgiFormat::R32G32B32A32_FLOAT.pitch_or_linear_size(0x2000_0000, 1),
            None
        );
        assert_eq!(DxgiFormat::R32G32B32A32_FLOAT.mip_sizes(0x2000_0000, 1, 2), None);
    }
}
