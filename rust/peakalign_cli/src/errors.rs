use peakalign::PeakAlignError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Error reading or writing {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("JSON parsing error in {path}: {source}")]
    Json {
        source: serde_json::Error,
        path: PathBuf,
    },

    #[error("Error interpreting the config: {0}")]
    Config(String),

    #[error("Alignment failed: {0}")]
    Alignment(#[from] PeakAlignError),
}

impl CliError {
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        CliError::Io {
            source,
            path: path.into(),
        }
    }
}
