//! Configuration loading and parsing.
//!
//! Parses `visor.toml` (or an override path provided by the binary):
//!
//! ```toml
//! [io]
//! staging_size = 4096
//! use_mmap = true
//! [spans]
//! initial_capacity = 16
//! [scratch]
//! initial_capacity = 256
//! [view]
//! rows = 0            # 0: follow the terminal
//! scroll_margin = 0
//! ```
//!
//! Every key is optional. A missing file yields defaults; so does a file that
//! fails to parse, after a `warn` on the `config` target. Unknown fields are
//! ignored. Values that cannot be used as given (zero sizes, a margin larger
//! than the view allows) are clamped where they are applied and the clamp is
//! logged.

use anyhow::Result;
use core_state::{STAGING_SIZE, Tuning};
use core_text::Capacities;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const FILE_NAME: &str = "visor.toml";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct IoConfig {
    #[serde(default = "IoConfig::default_staging_size")]
    pub staging_size: usize,
    #[serde(default = "IoConfig::default_use_mmap")]
    pub use_mmap: bool,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            staging_size: Self::default_staging_size(),
            use_mmap: Self::default_use_mmap(),
        }
    }
}

impl IoConfig {
    const fn default_staging_size() -> usize {
        STAGING_SIZE
    }
    const fn default_use_mmap() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SpansConfig {
    #[serde(default = "SpansConfig::default_initial_capacity")]
    pub initial_capacity: usize,
}

impl Default for SpansConfig {
    fn default() -> Self {
        Self {
            initial_capacity: Self::default_initial_capacity(),
        }
    }
}

impl SpansConfig {
    fn default_initial_capacity() -> usize {
        Capacities::default().spans
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ScratchConfig {
    #[serde(default = "ScratchConfig::default_initial_capacity")]
    pub initial_capacity: usize,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            initial_capacity: Self::default_initial_capacity(),
        }
    }
}

impl ScratchConfig {
    fn default_initial_capacity() -> usize {
        Capacities::default().scratch
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ViewConfig {
    /// Text rows; 0 follows the terminal height.
    #[serde(default)]
    pub rows: u16,
    #[serde(default)]
    pub scroll_margin: u16,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub io: IoConfig,
    #[serde(default)]
    pub spans: SpansConfig,
    #[serde(default)]
    pub scratch: ScratchConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>,          // original file string (optional)
    pub file: ConfigFile,             // parsed (or default) data
    pub effective_scroll_margin: u16, // clamped to the view height
}

/// Config path: `visor.toml` in the working directory when present, else the
/// platform config dir (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from(FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("visor").join(FILE_NAME);
    }
    local
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "loaded");
            Ok(Config {
                raw: Some(content),
                file,
                effective_scroll_margin: 0, // computed later
            })
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "parse_failed_using_defaults");
            Ok(Config::default())
        }
    }
}

impl Config {
    /// Buffer storage and I/O knobs, with zero sizes raised to 1.
    pub fn tuning(&self) -> Tuning {
        let f = &self.file;
        let raw = (
            f.io.staging_size,
            f.spans.initial_capacity,
            f.scratch.initial_capacity,
        );
        let staging_size = raw.0.max(1);
        let capacities = Capacities {
            spans: raw.1.max(1),
            scratch: raw.2.max(1),
        };
        if (staging_size, capacities.spans, capacities.scratch) != raw {
            info!(
                target: "config",
                staging_size,
                spans = capacities.spans,
                scratch = capacities.scratch,
                "zero_sizes_clamped"
            );
        }
        Tuning {
            staging_size,
            capacities,
            use_mmap: f.io.use_mmap,
        }
    }

    /// Configured view height, or `None` to follow the terminal.
    pub fn view_rows(&self) -> Option<u16> {
        (self.file.view.rows > 0).then_some(self.file.view.rows)
    }

    /// Clamp the scroll margin to `(text_rows - 2) / 2` (0 for views of
    /// three rows or fewer). Returns the effective value.
    pub fn apply_view_height(&mut self, text_rows: u16) -> u16 {
        let raw = self.file.view.scroll_margin;
        let max = if text_rows <= 3 { 0 } else { (text_rows - 2) / 2 };
        let clamped = raw.min(max);
        if clamped != raw {
            info!(target: "config", raw, clamped, max, text_rows, "scroll_margin_clamped");
        }
        self.effective_scroll_margin = clamped;
        clamped
    }

    /// Re-clamp after the view height changed. `Some(new_margin)` when the
    /// effective value moved.
    pub fn recompute_after_resize(&mut self, text_rows: u16) -> Option<u16> {
        let prev = self.effective_scroll_margin;
        let current = self.apply_view_height(text_rows);
        (current != prev).then_some(current)
    }
}
