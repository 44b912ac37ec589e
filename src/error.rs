use std::path::PathBuf;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

/// Errors raised by the JSON profile store.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to read profile {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse profile {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write profile {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown game '{0}' (expected pong, connect4, rps, dodge or memory)")]
    UnknownGame(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("pong.alpha must be in (0, 1]".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: pong.alpha must be in (0, 1]"
        );
    }

    #[test]
    fn test_profile_error_display() {
        let err = ProfileError::UnknownGame("chess".into());
        assert_eq!(
            err.to_string(),
            "unknown game 'chess' (expected pong, connect4, rps, dodge or memory)"
        );

        let err = ProfileError::Read {
            path: PathBuf::from("profile.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.to_string(), "failed to read profile profile.json: missing");
    }
}
