use std::path::PathBuf;

use thiserror::Error;

use crate::engine::SurfaceKind;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine home directory")]
    NoHomeDir,

    #[error("failed to read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write settings file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("settings file {path:?} must contain a mapping at the top level")]
    NotAMapping { path: PathBuf },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("settings backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to mount {kind:?}: {reason}")]
    Mount { kind: SurfaceKind, reason: String },
}
