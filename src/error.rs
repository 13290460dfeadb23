use std::path::PathBuf;

use thiserror::Error;

use crate::generator::GenerationError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("error reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Typst compilation failed: {0}")]
    Compile(String),

    #[error("PDF generation failed: {0}")]
    Export(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}
