use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], for callers that only care about
/// what went wrong rather than where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    ParseFailure,
    Io,
    Config,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot open {}. File does not exist.", .0.display())]
    FileNotFound(PathBuf),

    #[error("{0} does not exist.")]
    ClassNotFound(String),

    #[error("no class declaration found to edit")]
    NoClass,

    #[error("Cannot create {}. File already exists.", .0.display())]
    AlreadyExists(PathBuf),

    #[error("parse error at {0}")]
    Parse(#[from] ParseError),

    #[error("invalid {what} name `{name}`")]
    InvalidName { what: &'static str, name: String },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::FileNotFound(_) | Error::ClassNotFound(_) | Error::NoClass => ErrorKind::NotFound,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::Parse(_) | Error::InvalidName { .. } => ErrorKind::ParseFailure,
            Error::Io { .. } => ErrorKind::Io,
            Error::Config { .. } => ErrorKind::Config,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

/// Source text that does not conform to the grammar the parser understands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    /// 1-indexed
    pub line: usize,
    /// 1-indexed, counted in characters
    pub column: usize,
}

impl ParseError {
    /// Build an error pointing at byte `offset` of `source`.
    pub fn at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;

        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_position() {
        let source = "<?php\n\nclass Foo {\n";
        let err = ParseError::at(source, source.find('{').unwrap(), "unclosed `{`");

        assert_eq!(err.line, 3);
        assert_eq!(err.column, 11);
        assert_eq!(err.to_string(), "line 3, column 11: unclosed `{`");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::NoClass.kind(), ErrorKind::NotFound);
        assert_eq!(Error::ClassNotFound("Foo".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::AlreadyExists(PathBuf::from("a.php")).kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(
            Error::InvalidName { what: "method", name: "1x".into() }.kind(),
            ErrorKind::ParseFailure
        );
    }

    #[test]
    fn test_messages_match_cli_wording() {
        let err = Error::FileNotFound(PathBuf::from("/tmp/fakefile.php"));
        assert_eq!(err.to_string(), "Cannot open /tmp/fakefile.php. File does not exist.");

        let err = Error::ClassNotFound("Bogus\\ClassName".into());
        assert_eq!(err.to_string(), "Bogus\\ClassName does not exist.");
    }
}
