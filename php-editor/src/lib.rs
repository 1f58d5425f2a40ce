//! Format-preserving editing of PHP class files.
//!
//! Parse a file, add methods and `use` imports, and print it back with every
//! untouched byte where it was.

pub mod config;
pub mod diff;
pub mod docblock;
pub mod editor;
pub mod error;
pub mod file;
pub mod lexer;
pub mod locator;
pub mod operations;
pub mod parser;
pub mod printer;
pub mod skeleton;
pub mod storage;
pub mod surgical;
pub mod syntax;

#[cfg(test)]
mod tests;

pub use config::{Config, LineEnding, Style};
pub use diff::{DiffStats, FileDiff};
pub use docblock::{DocBlock, TagValue};
pub use editor::PhpEditor;
pub use error::{Error, ErrorKind, ParseError, Result};
pub use file::PhpFile;
pub use locator::{ChainLocator, ClassLocator, Psr4Locator, SourceTreeLocator};
pub use operations::*;
pub use storage::{FsStorage, Storage};
pub use syntax::Visibility;
