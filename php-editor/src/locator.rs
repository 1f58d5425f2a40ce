//! Resolving a fully qualified class name to the file that declares it.
//!
//! [`Psr4Locator`] maps namespace prefixes to directories the way composer's
//! autoloader does. [`SourceTreeLocator`] is the fallback for code that does
//! not follow PSR-4: it parses every `.php` file under its roots and checks
//! the declared class names. [`ChainLocator`] tries several in order.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};
use crate::parser;

pub trait ClassLocator {
    /// Path of the file declaring `class`, if it can be found.
    fn locate(&self, class: &str) -> Option<PathBuf>;
}

fn normalize_class(class: &str) -> &str {
    class.trim().trim_start_matches('\\')
}

#[derive(Debug, Default, Deserialize)]
struct ComposerManifest {
    #[serde(default)]
    autoload: Autoload,
    #[serde(default, rename = "autoload-dev")]
    autoload_dev: Autoload,
}

#[derive(Debug, Default, Deserialize)]
struct Autoload {
    #[serde(default, rename = "psr-4")]
    psr4: IndexMap<String, Directories>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Directories {
    One(String),
    Many(Vec<String>),
}

impl Directories {
    fn into_vec(self) -> Vec<String> {
        match self {
            Directories::One(dir) => vec![dir],
            Directories::Many(dirs) => dirs,
        }
    }
}

/// PSR-4 autoloading rules: namespace prefix to base directories.
#[derive(Debug, Clone, Default)]
pub struct Psr4Locator {
    /// Prefixes end with `\` (or are empty), longest first.
    prefixes: Vec<(String, Vec<PathBuf>)>,
}

impl Psr4Locator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_prefix(&mut self, prefix: &str, dir: impl Into<PathBuf>) -> &mut Self {
        let mut prefix = normalize_class(prefix).trim_end_matches('\\').to_string();
        if !prefix.is_empty() {
            prefix.push('\\');
        }

        let dir = dir.into();
        match self.prefixes.iter_mut().find(|(p, _)| *p == prefix) {
            Some((_, dirs)) => dirs.push(dir),
            None => {
                self.prefixes.push((prefix, vec![dir]));
                self.prefixes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
            }
        }
        self
    }

    /// Read the `autoload` and `autoload-dev` PSR-4 maps of a composer.json.
    /// Directories are relative to the manifest.
    pub fn from_composer(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let base = path.parent().unwrap_or(Path::new(""));
        let locator = Self::from_composer_json(&text, base).map_err(|message| Error::Config {
            path: path.to_path_buf(),
            message,
        })?;

        tracing::debug!(
            manifest = %path.display(),
            prefixes = locator.prefixes.len(),
            "loaded psr-4 autoload rules"
        );
        Ok(locator)
    }

    fn from_composer_json(text: &str, base: &Path) -> std::result::Result<Self, String> {
        let manifest: ComposerManifest = serde_json::from_str(text).map_err(|e| e.to_string())?;

        let mut locator = Self::new();
        for autoload in [manifest.autoload, manifest.autoload_dev] {
            for (prefix, dirs) in autoload.psr4 {
                for dir in dirs.into_vec() {
                    locator.add_prefix(&prefix, base.join(dir));
                }
            }
        }
        Ok(locator)
    }
}

impl ClassLocator for Psr4Locator {
    fn locate(&self, class: &str) -> Option<PathBuf> {
        let class = normalize_class(class);

        for (prefix, dirs) in &self.prefixes {
            let Some(rest) = class.strip_prefix(prefix.as_str()) else {
                continue;
            };
            let relative = format!("{}.php", rest.replace('\\', "/"));
            for dir in dirs {
                let candidate = dir.join(&relative);
                tracing::trace!(candidate = %candidate.display(), "checking psr-4 candidate");
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

/// Scans directories for a file declaring the class.
#[derive(Debug, Clone, Default)]
pub struct SourceTreeLocator {
    roots: Vec<PathBuf>,
}

impl SourceTreeLocator {
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    fn declares(path: &Path, class: &str) -> bool {
        let Ok(source) = fs::read_to_string(path) else {
            return false;
        };

        let short = class.rsplit('\\').next().unwrap_or(class).to_ascii_lowercase();
        if !source.to_ascii_lowercase().contains(&short) {
            return false;
        }

        match parser::parse(&source) {
            Ok((tree, _)) => tree
                .declared_classes()
                .iter()
                .any(|declared| declared.eq_ignore_ascii_case(class)),
            Err(e) => {
                tracing::trace!(path = %path.display(), error = %e, "skipping unparsable file");
                false
            }
        }
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || name == "vendor" || name == "node_modules")
}

impl ClassLocator for SourceTreeLocator {
    fn locate(&self, class: &str) -> Option<PathBuf> {
        let class = normalize_class(class);

        for root in &self.roots {
            let found = WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !is_skipped_dir(e))
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("php"))
                .find(|e| Self::declares(e.path(), class));

            if let Some(entry) = found {
                return Some(entry.into_path());
            }
        }
        None
    }
}

/// Tries each locator in turn.
#[derive(Default)]
pub struct ChainLocator {
    locators: Vec<Box<dyn ClassLocator>>,
}

impl ChainLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, locator: impl ClassLocator + 'static) -> &mut Self {
        self.locators.push(Box::new(locator));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

impl ClassLocator for ChainLocator {
    fn locate(&self, class: &str) -> Option<PathBuf> {
        self.locators.iter().find_map(|locator| locator.locate(class))
    }
}
