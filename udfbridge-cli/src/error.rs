//! CLI-specific error types and exit code mapping

use udfbridge_core::{TranslationError, UdfBridgeError};
use udfbridge_engine::EngineError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The engine rejected or failed a translation.
    #[error("translation failed: {0}")]
    Translation(#[from] TranslationError),

    /// The rule could not be interpreted by the platform's validator.
    #[error("content is not valid {0}")]
    Invalid(String),

    /// Some items of a batch did not succeed.
    #[error("{failed} of {total} item(s) failed")]
    Partial { failed: usize, total: usize },

    /// JSON (de)serialisation failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading a rule or batch file failed.
    #[error("failed to read {path}: {source}")]
    Input {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error (stdin, stdout write).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | General / command error          |
    /// | 2    | Configuration error              |
    /// | 3    | Translation or validation failure |
    /// | 4    | IO error                         |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Translation(_) | Self::Invalid(_) | Self::Partial { .. } => 3,
            Self::Input { .. } | Self::Io(_) => 4,
            Self::Command(_) | Self::Json(_) => 1,
        }
    }
}

impl From<UdfBridgeError> for CliError {
    fn from(e: UdfBridgeError) -> Self {
        match e {
            UdfBridgeError::Config(e) => Self::Config(e.to_string()),
            UdfBridgeError::Translation(e) => Self::Translation(e),
            UdfBridgeError::Io(e) => Self::Io(e),
        }
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use udfbridge_core::ConfigError;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_translation_error() {
        let err = CliError::from(TranslationError::Timeout { elapsed_ms: 10 });
        assert_eq!(err.exit_code(), 3, "translation error should return exit code 3");
    }

    #[test]
    fn test_exit_code_partial_batch() {
        let err = CliError::Partial {
            failed: 1,
            total: 4,
        };
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.to_string(), "1 of 4 item(s) failed");
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 4, "io error should return exit code 4");
    }

    #[test]
    fn test_input_error_names_path() {
        let err = CliError::Input {
            path: "rules/missing.rules".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("rules/missing.rules"));
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("test error".to_owned());
        assert_eq!(err.exit_code(), 1, "command error should return exit code 1");
    }

    #[test]
    fn test_core_error_conversion() {
        let config_err = CliError::from(UdfBridgeError::Config(ConfigError::FileNotFound {
            path: "/nope.toml".to_owned(),
        }));
        assert_eq!(config_err.exit_code(), 2);
        assert!(config_err.to_string().contains("/nope.toml"));

        let io_err = CliError::from(UdfBridgeError::Io(std::io::Error::other("disk")));
        assert_eq!(io_err.exit_code(), 4);
    }
}
