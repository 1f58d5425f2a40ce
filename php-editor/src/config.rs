//! Project configuration, read from `.php-editor.toml`.
//!
//! ```toml
//! [style]
//! indent = "    "
//! final_newline = false
//! line_ending = "lf"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CONFIG_FILE_NAME: &str = ".php-editor.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub style: Style,
}

/// Layout of canonically printed code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Style {
    /// One level of indentation.
    pub indent: String,
    /// End freshly generated files with a newline.
    pub final_newline: bool,
    /// Line breaks of generated files. Edited files keep their own.
    pub line_ending: LineEnding,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            indent: "    ".to_string(),
            final_newline: false,
            line_ending: LineEnding::Lf,
        }
    }
}

impl Style {
    pub fn indentation(&self, level: usize) -> String {
        self.indent.repeat(level)
    }

    pub fn newline(&self) -> &'static str {
        self.line_ending.as_str()
    }

    /// `count` line breaks.
    pub fn newlines(&self, count: usize) -> String {
        self.newline().repeat(count)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }

    /// The line ending of the first line break in `text`.
    pub fn detect(text: &str) -> Option<Self> {
        let at = text.find('\n')?;
        Some(if text[..at].ends_with('\r') {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        })
    }
}

impl Config {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;

        if !config.style.indent.chars().all(|c| c == ' ' || c == '\t') {
            return Err(Error::Config {
                path: path.to_path_buf(),
                message: "style.indent may only contain spaces and tabs".to_string(),
            });
        }

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config = Self::from_toml(&text, path)?;
        tracing::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Find the nearest config file in `start` or one of its ancestors.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Load the nearest config file, or the defaults if there is none.
    pub fn discover_and_load(start: &Path) -> Result<Self> {
        match Self::discover(start) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}
