use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtError {
    #[error("no image provided (set TT_ART_IMAGE, art.image in the config, or pass --image)")]
    NoImage,
    #[error("image not found: {} (use an absolute path or make sure it is mounted)", .path.display())]
    ImageNotFound { path: PathBuf },
    #[error("cannot open image '{}': {message}. Re-save as PNG/JPG (8-bit) and retry", .path.display())]
    ImageDecode { path: PathBuf, message: String },
    #[error("image decoding support is not available in this build")]
    DecoderUnavailable,
    #[error("invalid value '{value}' for {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("route layer '{name}' not found in tech")]
    UnknownLayer { name: String },
    #[error("failed to create route obstruction on {layer}: {message}")]
    ObstructionFailed { layer: String, message: String },
    #[error("{}:{line}: {message}", .path.display())]
    Def {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("{}: {message}", .path.display())]
    Lef { path: PathBuf, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ArtError {
    /// User-actionable errors that should end the run with the
    /// configuration-error exit status rather than a generic failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ArtError::NoImage
                | ArtError::ImageNotFound { .. }
                | ArtError::ImageDecode { .. }
                | ArtError::InvalidParameter { .. }
                | ArtError::UnknownLayer { .. }
                | ArtError::ObstructionFailed { .. }
        )
    }
}
