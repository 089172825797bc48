//! Domain error types.

/// Top-level error type for auag.
///
/// Only `Validation` and terminal `Fetch` errors are meant to reach the
/// user; parse problems drop individual rows and cache write failures
/// are swallowed by the store.
#[derive(Debug, thiserror::Error)]
pub enum AuagError {
    #[error("validation error: {reason}")]
    Validation { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("parse error: {reason}")]
    Parse { reason: String },

    #[error("fetch error: {reason}")]
    Fetch { reason: String },

    #[error("cache error: {reason}")]
    Cache { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&AuagError> for std::process::ExitCode {
    fn from(err: &AuagError) -> Self {
        let code: u8 = match err {
            AuagError::Io(_) => 1,
            AuagError::ConfigParse { .. }
            | AuagError::ConfigMissing { .. }
            | AuagError::ConfigInvalid { .. } => 2,
            AuagError::Cache { .. } => 3,
            AuagError::Parse { .. } => 4,
            AuagError::Validation { .. } => 5,
            AuagError::Fetch { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let err = AuagError::Validation {
            reason: "end date before start date".into(),
        };
        assert_eq!(
            err.to_string(),
            "validation error: end date before start date"
        );

        let err = AuagError::ConfigMissing {
            section: "api".into(),
            key: "key".into(),
        };
        assert_eq!(err.to_string(), "missing config key [api] key");
    }

    #[test]
    fn io_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AuagError = io.into();
        assert_eq!(err.to_string(), "gone");
    }
}
