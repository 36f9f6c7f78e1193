use thiserror::Error;

use crate::constants::{NaifId, TdbSeconds};

#[derive(Error, Debug)]
pub enum OrreryError {
    #[error("Malformed or unsupported kernel file {path}: {reason}")]
    Format { path: String, reason: String },

    #[error(
        "Time {tdb_seconds} s TDB is outside the coverage of link {center} -> {target}{}",
        coverage_suffix(.coverage)
    )]
    OutOfRange {
        center: NaifId,
        target: NaifId,
        tdb_seconds: TdbSeconds,
        coverage: Option<(TdbSeconds, TdbSeconds)>,
    },

    #[error("No chain of kernel segments connects body {observer} to body {target} at {tdb_seconds} s TDB")]
    NoPath {
        target: NaifId,
        observer: NaifId,
        tdb_seconds: TdbSeconds,
    },

    #[error("No known rotation path from frame {from} to frame {to}")]
    UnsupportedFrame { from: String, to: String },

    #[error("Invalid SPK data type: {0}")]
    InvalidSpkDataType(i32),

    #[error("SPK data type {0} cannot be evaluated")]
    UnsupportedDataType(i32),

    #[error("Time scale mismatch: expected {expected}, found {found}")]
    ScaleMismatch { expected: String, found: String },

    #[error("Invalid leap-second table: {0}")]
    LeapSecondTable(String),

    #[error("Invalid calendar date: {0}")]
    InvalidCalendarDate(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown body name: {0}")]
    UnknownBody(String),

    #[error("Invalid observing site: {0}")]
    InvalidSite(String),

    #[error("Error during the nom parsing: {0}")]
    NomParsingError(String),

    #[error("Unable to perform file operation on {path}: {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, OrreryError>;

fn coverage_suffix(coverage: &Option<(TdbSeconds, TdbSeconds)>) -> String {
    match coverage {
        Some((start, end)) => format!(" (loaded coverage [{start}, {end}) s)"),
        None => String::new(),
    }
}

impl OrreryError {
    /// Shorthand for a [`OrreryError::Format`] raised while reading `path`.
    pub(crate) fn format(path: impl Into<String>, reason: impl Into<String>) -> Self {
        OrreryError::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the path that produced it.
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        OrreryError::IoError {
            path: path.into(),
            source,
        }
    }
}

impl<E: std::fmt::Debug> From<nom::Err<E>> for OrreryError {
    fn from(err: nom::Err<E>) -> Self {
        OrreryError::NomParsingError(format!("{err:?}"))
    }
}

impl From<toml::de::Error> for OrreryError {
    fn from(err: toml::de::Error) -> Self {
        OrreryError::Config(err.to_string())
    }
}

impl From<ordered_float::FloatIsNan> for OrreryError {
    fn from(_: ordered_float::FloatIsNan) -> Self {
        OrreryError::InvalidSite("coordinate is NaN".into())
    }
}

impl PartialEq for OrreryError {
    fn eq(&self, other: &Self) -> bool {
        use OrreryError::*;
        match (self, other) {
            (Format { path: p1, reason: r1 }, Format { path: p2, reason: r2 }) => {
                p1 == p2 && r1 == r2
            }
            (
                OutOfRange {
                    center: c1,
                    target: t1,
                    tdb_seconds: s1,
                    coverage: v1,
                },
                OutOfRange {
                    center: c2,
                    target: t2,
                    tdb_seconds: s2,
                    coverage: v2,
                },
            ) => c1 == c2 && t1 == t2 && s1 == s2 && v1 == v2,
            (
                NoPath {
                    target: t1,
                    observer: o1,
                    tdb_seconds: s1,
                },
                NoPath {
                    target: t2,
                    observer: o2,
                    tdb_seconds: s2,
                },
            ) => t1 == t2 && o1 == o2 && s1 == s2,
            (UnsupportedFrame { from: f1, to: t1 }, UnsupportedFrame { from: f2, to: t2 }) => {
                f1 == f2 && t1 == t2
            }
            (InvalidSpkDataType(a), InvalidSpkDataType(b)) => a == b,
            (UnsupportedDataType(a), UnsupportedDataType(b)) => a == b,
            (
                ScaleMismatch {
                    expected: e1,
                    found: f1,
                },
                ScaleMismatch {
                    expected: e2,
                    found: f2,
                },
            ) => e1 == e2 && f1 == f2,
            (LeapSecondTable(a), LeapSecondTable(b)) => a == b,
            (InvalidCalendarDate(a), InvalidCalendarDate(b)) => a == b,
            (Config(a), Config(b)) => a == b,
            (UnknownBody(a), UnknownBody(b)) => a == b,
            (InvalidSite(a), InvalidSite(b)) => a == b,
            (NomParsingError(a), NomParsingError(b)) => a == b,

            // I/O errors are not comparable: equal if same variant and same path
            (IoError { path: a, .. }, IoError { path: b, .. }) => a == b,

            _ => false,
        }
    }
}
