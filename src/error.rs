use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ImpactError {
    #[error("unable to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("no image loaded")]
    NoImage,
    #[error("unable to encode PNG: {0}")]
    Encode(#[source] image::ImageError),
    #[error("image too large to composite ({width}x{height})")]
    Canvas { width: u32, height: u32 },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
