//! Editing options loaded from `oxvi.toml`.
//!
//! The engine reads options through the flat, copyable [`Options`] value and
//! never parses or persists configuration itself. This crate owns the file
//! format: three tables (`[search]`, `[input]`, `[screen]`) whose fields all
//! default, so a partial or missing file is valid. Unknown fields are
//! ignored. A file that fails to parse falls back to defaults with a warning
//! rather than refusing to start.
//!
//! ```toml
//! [search]
//! wrapscan = true
//! ignorecase = false
//!
//! [input]
//! autoindent = true
//! wrapmargin = 10
//! werase = "alt"
//! ```

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

pub const CONFIG_FILE_NAME: &str = "oxvi.toml";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    pub wrapscan: bool,
    pub ignorecase: bool,
    /// Extended (egrep-style) regular expressions.
    pub extended: bool,
    pub magic: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            wrapscan: true,
            ignorecase: false,
            extended: false,
            magic: true,
        }
    }
}

/// Which characters end a word for `^W`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WordErase {
    /// Word characters versus everything else.
    #[default]
    Historic,
    /// Blank-delimited words (altwerase).
    Alt,
    /// Blank-delimited words, stopping at the insertion boundary (ttywerase).
    Tty,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct InputConfig {
    pub autoindent: bool,
    /// Distance from the right edge at which input wraps; 0 disables.
    pub wrapmargin: u16,
    /// Absolute column at which input wraps; used when `wrapmargin` is 0.
    pub wraplen: u16,
    pub tabstop: u16,
    pub shiftwidth: u16,
    /// Discard control characters other than tab and form feed.
    pub beautify: bool,
    pub werase: WordErase,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            autoindent: false,
            wrapmargin: 0,
            wraplen: 0,
            tabstop: 8,
            shiftwidth: 8,
            beautify: false,
            werase: WordErase::Historic,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ScreenConfig {
    pub columns: u16,
    /// Report informational conditions such as "Search wrapped".
    pub warn: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            columns: 80,
            warn: true,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub screen: ScreenConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
}

/// Effective option values read by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub wrapscan: bool,
    pub ignorecase: bool,
    pub extended: bool,
    pub magic: bool,
    pub autoindent: bool,
    pub wrapmargin: usize,
    pub wraplen: usize,
    pub tabstop: usize,
    pub shiftwidth: usize,
    pub beautify: bool,
    pub werase: WordErase,
    pub columns: usize,
    pub warn: bool,
}

impl Default for Options {
    fn default() -> Self {
        ConfigFile::default().options()
    }
}

impl Options {
    /// Column at which text input wraps, or 0 when wrapping is off.
    pub fn margin(&self) -> usize {
        if self.wrapmargin != 0 {
            self.columns.saturating_sub(self.wrapmargin)
        } else {
            self.wraplen
        }
    }
}

impl ConfigFile {
    /// Flatten into engine options, replacing zero tab widths with 8.
    pub fn options(&self) -> Options {
        let nonzero = |name: &'static str, v: u16| {
            if v == 0 {
                info!(target: "config", option = name, "zero_width_replaced");
                8
            } else {
                v as usize
            }
        };
        Options {
            wrapscan: self.search.wrapscan,
            ignorecase: self.search.ignorecase,
            extended: self.search.extended,
            magic: self.search.magic,
            autoindent: self.input.autoindent,
            wrapmargin: self.input.wrapmargin as usize,
            wraplen: self.input.wraplen as usize,
            tabstop: nonzero("tabstop", self.input.tabstop),
            shiftwidth: nonzero("shiftwidth", self.input.shiftwidth),
            beautify: self.input.beautify,
            werase: self.input.werase,
            columns: self.screen.columns as usize,
            warn: self.screen.warn,
        }
    }
}

impl Config {
    pub fn options(&self) -> Options {
        self.file.options()
    }
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    // Prefer a local working directory file before the platform config dir.
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("oxvi").join(CONFIG_FILE_NAME);
    }
    PathBuf::from(CONFIG_FILE_NAME)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(Config {
                raw: Some(content),
                file,
            })
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed");
            Ok(Config::default())
        }
    }
}
