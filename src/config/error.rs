//! Configuration load failures. All of them are fatal.

use std::path::{Path, PathBuf};

/// Errors raised while loading and resolving a project configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The base configuration file does not exist.
    #[error("Config file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// A configuration file exists but could not be read.
    #[error("Failed to read config file: {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file is not valid YAML for the schema.
    #[error("Failed to parse config file: {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Both `image` and `build` were configured.
    #[error("Only one of `image` or `build` can be configured")]
    ImageAndBuild,

    /// No project name was given and none could be derived.
    #[error("Project name is required (set `name` in airlock.yaml)")]
    MissingName,

    /// `workdir` must be an absolute path inside the sandbox.
    #[error("workdir must be an absolute container path, got '{0}'")]
    RelativeWorkdir(String),

    /// The `engine` value is not a known engine.
    #[error("Unknown container engine '{0}' (expected podman or docker)")]
    UnknownEngine(String),
}

impl ConfigError {
    pub(crate) fn read(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub(crate) fn parse(path: &Path, source: serde_yaml::Error) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_maps_to_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ConfigError::read(Path::new("/srv/demo/airlock.yaml"), io);
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert_eq!(err.to_string(), "Config file not found: /srv/demo/airlock.yaml");
    }

    #[test]
    fn test_other_io_errors_keep_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::read(Path::new("/srv/demo/airlock.yaml"), io);
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }
}
