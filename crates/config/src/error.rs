// Copyright Katana Graph Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors for the config crate.

use miette::Diagnostic;

/// Errors that can occur while parsing or validating substrate configuration.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum Error {
    /// A collection of errors that occurred during validation of a configuration document.
    #[error("Invalid configuration: {errors:?}")]
    #[diagnostic(code(katana_config::invalid_configuration), url(docsrs))]
    InvalidConfiguration {
        /// The individual validation errors.
        #[related]
        errors: Vec<Error>,
    },

    /// An error that occurred while reading a configuration file.
    #[error("file read error for '{path}': {details}")]
    #[diagnostic(code(katana_config::file_read_error), url(docsrs))]
    FileReadError {
        /// The path that could not be read.
        path: String,
        /// A description of the underlying error.
        details: String,
    },

    /// An error that occurred while deserializing a configuration document.
    #[error("{format} deserialization error: {details}")]
    #[diagnostic(code(katana_config::deserialization_error), url(docsrs))]
    DeserializationError {
        /// The format of the document (e.g. "YAML", "JSON").
        format: String,
        /// A description of the underlying error.
        details: String,
    },

    /// A field was out of its allowed range.
    #[error("field '{field}' is invalid: {reason}")]
    #[diagnostic(code(katana_config::invalid_field), url(docsrs))]
    InvalidField {
        /// The dotted path of the offending field.
        field: String,
        /// Why the value is rejected.
        reason: String,
    },
}

/// Convenience alias for fallible config operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_configuration_collects_related_errors() {
        let err = Error::InvalidConfiguration {
            errors: vec![Error::InvalidField {
                field: "memory.physical_budget_bytes".to_string(),
                reason: "must be greater than 0".to_string(),
            }],
        };
        assert!(err.to_string().contains("Invalid configuration"));
    }
}
