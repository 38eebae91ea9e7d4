#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the readme-stats crate."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.
//!
//! Every failure aborts the run: nothing here is retried or recovered, and the
//! README is only written after all steps succeed.

use std::path::{Path, PathBuf};

/// Unified error type returned by the pipeline and the CLI.
///
/// Variants follow the failure taxonomy of a run: missing configuration,
/// credentials rejected by a remote service, throttling, network failures,
/// malformed payloads, and templates referencing statistics that were not
/// computed. Messages never include credential values.
#[derive(Debug, masterror::Error,)]
pub enum Error
{
    /// Required configuration is missing or invalid.
    #[error("configuration error: {message}")]
    Configuration {
        /// Human readable description of the configuration problem.
        message: String,
    },
    /// A remote service rejected the supplied credentials.
    #[error("authentication failed: {message}")]
    Authentication {
        /// Description including the rejecting endpoint and status.
        message: String,
    },
    /// A remote service signalled throttling.
    #[error("rate limit exceeded: {message}")]
    RateLimit {
        /// Description of the throttled request.
        message: String,
        /// Unix timestamp at which the quota resets, when reported.
        reset:   Option<u64,>,
    },
    /// Network failure or unexpected response status.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the failed request.
        message: String,
    },
    /// A remote payload could not be decoded.
    #[error("malformed payload: {message}")]
    Payload {
        /// Description of the decoding failure.
        message: String,
    },
    /// A recognized marker requires a statistic that was not computed.
    #[error("marker {marker} requires statistic '{key}' which was not computed")]
    IncompleteData {
        /// Marker name as written in the document.
        marker: String,
        /// Statistic key the marker renders.
        key:    String,
    },
    /// Wraps I/O errors raised while reading or writing the document.
    #[error("failed to access {path:?}: {source}")]
    Io {
        /// Location of the file being accessed.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Wraps serialization errors when emitting computed statistics.
    #[error("failed to serialize statistics: {message}")]
    Serialize {
        /// Description of the serialization failure.
        message: String,
    },
}

impl Error
{
    /// Constructs a configuration error from the provided message.
    pub fn configuration<M,>(message: M,) -> Self
    where
        M: Into<String,>,
    {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Constructs an authentication error from the provided message.
    pub fn authentication<M,>(message: M,) -> Self
    where
        M: Into<String,>,
    {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Constructs a transport error from the provided message.
    pub fn transport<M,>(message: M,) -> Self
    where
        M: Into<String,>,
    {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Constructs a payload error from the provided message.
    pub fn payload<M,>(message: M,) -> Self
    where
        M: Into<String,>,
    {
        Self::Payload {
            message: message.into(),
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// The returned string matches the [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self,) -> String
    {
        format!("{self}")
    }
}

impl From<serde_json::Error,> for Error
{
    fn from(source: serde_json::Error,) -> Self
    {
        Self::Serialize {
            message: source.to_string(),
        }
    }
}

impl From<serde_yaml::Error,> for Error
{
    fn from(source: serde_yaml::Error,) -> Self
    {
        Self::Serialize {
            message: source.to_string(),
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error,) -> Error
{
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests
{
    use super::Error;

    #[test]
    fn configuration_constructor_populates_message()
    {
        let error = Error::configuration("ACCESS_TOKEN is not set",);
        match error {
            Error::Configuration {
                ref message,
            } => {
                assert_eq!(message, "ACCESS_TOKEN is not set");
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn to_display_string_matches_display()
    {
        let error = Error::transport("connection reset",);
        assert_eq!(error.to_string(), error.to_display_string());
        assert_eq!(error.to_string(), "transport error: connection reset");
    }

    #[test]
    fn incomplete_data_names_marker_and_key()
    {
        let error = Error::IncompleteData {
            marker: "TOTAL_FORKS".to_owned(),
            key:    "total_forks".to_owned(),
        };
        let rendered = error.to_string();
        assert!(rendered.contains("TOTAL_FORKS"));
        assert!(rendered.contains("'total_forks'"));
    }

    #[test]
    fn io_error_helper_wraps_path_and_source()
    {
        let path = std::path::Path::new("/tmp/README.md",);
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing",);
        let error = super::io_error(path, io_error,);

        match error {
            Error::Io {
                path: ref stored_path,
                ref source,
            } => {
                assert_eq!(stored_path, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[test]
    fn serde_json_conversion_maps_to_serialize_variant()
    {
        let invalid = serde_json::from_str::<serde_json::Value,>("not-json",).unwrap_err();
        let mapped: Error = invalid.into();
        assert!(matches!(mapped, Error::Serialize { .. }));
    }

    #[test]
    fn serde_yaml_conversion_maps_to_serialize_variant()
    {
        let invalid = serde_yaml::from_str::<usize,>("not-a-number",).unwrap_err();
        let mapped: Error = invalid.into();
        assert!(matches!(mapped, Error::Serialize { .. }));
    }
}
