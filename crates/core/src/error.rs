use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob length mismatch: expected {expected} bytes, found {actual}")]
    Format { expected: usize, actual: usize },

    #[error("invalid matrix shape: {rows}x{cols}")]
    InvalidShape { rows: i64, cols: i64 },

    #[error("not a compatible project store: {} (missing {missing})", .path.display())]
    SchemaMismatch { path: PathBuf, missing: String },

    #[error("image id {0} is outside the pair-encodable range")]
    PairEncodingOverflow(i64),

    #[error("output directory already exists: {}", .0.display())]
    OutputDirectoryExists(PathBuf),

    #[error("no canonical id for image #{image_id} of project #{project_id}")]
    MissingCanonicalId { project_id: i64, image_id: i64 },

    #[error("project not found: {0}")]
    ProjectNotFound(i64),

    #[error("project already registered: {}", .0.display())]
    ProjectAlreadyExists(PathBuf),

    #[error("project store does not exist: {}", .0.display())]
    ProjectStoreNotFound(PathBuf),

    #[error("invalid project file {}: {message}", .path.display())]
    ProjectFileInvalid { path: PathBuf, message: String },

    #[error("entity not found: {0}")]
    EntityNotFound(i64),

    #[error("image not found: {0}")]
    ImageNotFound(i64),

    #[error("entity {0} has no related images")]
    NoRelatedImages(i64),

    #[error("output root not configured; pass --output or run `synthmap output set <path>`")]
    OutputRootNotSet,
}

pub type Result<T> = std::result::Result<T, Error>;
