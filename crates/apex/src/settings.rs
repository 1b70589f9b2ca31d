//! Persistent user settings, stored as TOML next to the executable

use std::fs;
use std::path::{Path, PathBuf};

use apex_archive::{aaf::DEFAULT_BLOCK_SIZE, AafWriterOptions, CompressionMethod, CreateOptions};
use apex_texture::{convert::MAX_LEVELS, ConvertOptions};
use miette::{Context, IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Also write the output to `<exe>.log`
    pub generate_log: bool,
    pub archive: ArchiveSettings,
    pub gtoc: GtocSettings,
    pub texture: TextureSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    /// Write a `.toc` manifest when extracting
    pub generate_toc: bool,
    /// Files ending in any of these are never packed
    pub ignore_extensions: Vec<String>,
    /// Uncompressed size of an AAF block, at most 32 MiB
    pub aaf_block_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GtocSettings {
    pub sarc0_gtoc_path: PathBuf,
    pub expentities_gtoc_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureSettings {
    pub convert_dds_to_legacy: bool,
    pub force_unconventional_legacy_formats: bool,
    pub use_hmddsc: bool,
    pub no_tiling: bool,
    pub extract_largest_mipmap: bool,
    /// Only look for `.ddsc` files when scanning folders
    pub folder_scan_ddsc_only: bool,
    pub atx_levels: i64,
    pub atx_level_max_resolution: [u32; 3],
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            generate_toc: true,
            ignore_extensions: [
                ".hmddsc", ".atx1", ".atx2", ".atx3", ".ee", ".eez", ".bl", ".blz", ".fl", ".flz",
                ".nl", ".nlz", ".sarc", ".toc",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            aaf_block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl Default for GtocSettings {
    fn default() -> Self {
        Self {
            sarc0_gtoc_path: PathBuf::from("sarc.0.gtoc"),
            expentities_gtoc_path: PathBuf::from("expentities.gtoc"),
        }
    }
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            convert_dds_to_legacy: true,
            force_unconventional_legacy_formats: true,
            use_hmddsc: false,
            no_tiling: true,
            extract_largest_mipmap: false,
            folder_scan_ddsc_only: true,
            atx_levels: 2,
            atx_level_max_resolution: [256, 1024, 2048],
        }
    }
}

impl Settings {
    /// `<exe>.toml` next to the running executable
    pub fn default_path() -> Result<PathBuf> {
        let exe = std::env::current_exe()
            .into_diagnostic()
            .context("locating the executable")?;
        Ok(exe.with_extension("toml"))
    }

    /// Read settings from `path`, using defaults for the file or any key that
    /// is missing.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .into_diagnostic()
            .context(format!("reading {}", path.display()))?;

        toml::from_str(&text)
            .into_diagnostic()
            .context(format!("parsing {}", path.display()))
    }

    /// Write every setting to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self).into_diagnostic()?;
        fs::write(path, text)
            .into_diagnostic()
            .context(format!("writing {}", path.display()))
    }
}

impl ArchiveSettings {
    /// Options for building archives wrapped with `compression`
    pub fn create_options(&self, compression: CompressionMethod) -> CreateOptions {
        CreateOptions::builder()
            .compression(compression)
            .ignore_extensions(self.ignore_extensions.clone())
            .aaf(
                AafWriterOptions::builder()
                    .block_size(self.aaf_block_size.clamp(1, DEFAULT_BLOCK_SIZE))
                    .build(),
            )
            .build()
    }
}

impl TextureSettings {
    /// Number of sidecar levels, clamped to what the format allows
    pub fn levels(&self) -> u8 {
        let max = if self.use_hmddsc { 1 } else { MAX_LEVELS };
        let levels = self.atx_levels.clamp(0, i64::from(max)) as u8;

        if i64::from(levels) != self.atx_levels {
            warn!(
                "atx_levels {} is out of range 0..={max}, using {levels}",
                self.atx_levels
            );
        }

        levels
    }

    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions::builder()
            .convert_to_legacy(self.convert_dds_to_legacy)
            .force_unconventional(self.force_unconventional_legacy_formats)
            .use_hmddsc(self.use_hmddsc)
            .no_tiling(self.no_tiling)
            .extract_largest_mip(self.extract_largest_mipmap)
            .atx_levels(self.levels())
            .level_max_resolution(self.atx_level_max_resolution)
            .build()
    }
}
