//! This library converts the **AVTX** textures (`.ddsc`) used by games built on the *Apex* engine to
//! and from standard **DDS** files.
//!
//! An AVTX texture keeps its smallest mips in the `.ddsc` file and can stream the larger ones from
//! sidecar files, see [`avtx`]. Converting to DDS gathers every mip back into one file; converting
//! from DDS splits the mip chain into levels by resolution:
//!
//! | Level | Stored in            | Mips whose largest dimension is at most |
//! |-------|----------------------|-----------------------------------------|
//! | 0     | `.ddsc`              | 256                                     |
//! | 1     | `.atx1` or `.hmddsc` | 1024                                    |
//! | 2     | `.atx2`              | 2048                                    |
//! | 3     | `.atx3`              | anything larger                         |
//!
//! The resolutions and the number of levels are set through [`ConvertOptions`]. Cubemaps and
//! texture arrays never stream.
//!
//! ```no_run
//! use apex_texture::{convert_dds_file, ConvertOptions};
//!
//! let options = ConvertOptions::builder().atx_levels(1).build();
//! let report = convert_dds_file("rock.dds".as_ref(), &options)?;
//! # Ok::<(), apex_texture::error::Error>(())
//! ```

pub mod avtx;
pub mod convert;
pub mod dds;
pub mod error;
pub mod format;

pub use avtx::{AvtxHeader, AvtxTexture, FsSidecars, MemorySidecars, Sidecar, SidecarStore};
pub use convert::{
    avtx_to_dds, convert_avtx_file, convert_dds_file, dds_to_avtx, ConversionWarning,
    ConvertOptions, ConvertReport,
};
pub use dds::DdsHeader;
pub use format::DxgiFormat;
