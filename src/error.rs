//! # Error Handling
//!
//! This module defines the centralized error type for `gencontrol`. It uses
//! the `thiserror` library to describe every failure the generator can run
//! into, with enough context (scope, key, template name, path) to tell the
//! operator which piece of configuration needs fixing.
//!
//! ## Key Components
//!
//! - **`Error`**: The enum of all failure modes.
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! The generator never retries. Every variant is fatal for the run: the
//! configuration is expected to be validated by the operator before the
//! package build starts.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for gencontrol operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration dump could not be parsed.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the dump
        hint: Option<String>,
    },

    /// No configuration entry exists for a qualifier tuple that was indexed
    /// directly.
    #[error("Configuration section not found: {scope}")]
    MissingSection { scope: String },

    /// A required configuration key is absent after merging.
    #[error("Missing required field '{key}' in {scope}")]
    MissingField { scope: String, key: String },

    /// A configuration key holds a value of the wrong shape.
    #[error("Invalid value for '{key}' in {scope}: expected {expected}")]
    InvalidValue {
        scope: String,
        key: String,
        expected: String,
    },

    /// A template could not be found in any template directory.
    #[error("Template not found: {name}")]
    TemplateNotFound { name: String },

    /// An error occurred during template substitution.
    ///
    /// May include the name of the problematic variable when applicable.
    #[error("Template processing error: {message}{}", variable.as_ref().map(|v| format!(" (variable: {})", v)).unwrap_or_default())]
    Template {
        message: String,
        /// The template variable that caused the error, if applicable
        variable: Option<String>,
    },

    /// A control template could not be parsed into package stanzas.
    #[error("Control file parsing error in {name}: {message}")]
    ControlParse { name: String, message: String },

    /// The changelog could not be read or has no entries.
    #[error("Changelog error: {message}")]
    Changelog { message: String },

    /// A version string does not follow Debian or Linux versioning rules.
    #[error("Invalid version '{version}': {message}")]
    Version { version: String, message: String },

    /// A package stanza is missing a field the generator relies on.
    #[error("Package error: {message}")]
    Package { message: String },

    /// An I/O error on a known path.
    #[error("I/O error on {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A TOML parsing error, wrapped from `toml::de::Error`.
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Wrap an I/O error with the path that produced it.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::File {
            path: path.into(),
            source,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
