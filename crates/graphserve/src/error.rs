//! Error types for the graphserve core.

use thiserror::Error;

/// Errors raised while loading index artifacts or running a search.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// An artifact file could not be read.
    #[error("failed to read artifact '{path}': {source}")]
    ArtifactIo {
        /// Path of the artifact file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An artifact file was readable but did not have the expected schema.
    #[error("artifact '{path}' has unexpected schema: {reason}")]
    ArtifactSchema {
        /// Path of the artifact file.
        path: String,
        /// What was missing or mistyped.
        reason: String,
    },

    /// Parquet decoding failed.
    #[error("parquet error in '{path}': {source}")]
    Parquet {
        /// Path of the artifact file.
        path: String,
        /// Underlying parquet error.
        #[source]
        source: parquet::errors::ParquetError,
    },

    /// The vector store rejected an operation.
    #[error("vector store error: {0}")]
    VectorStore(String),

    /// A call to the language model or embedding API failed.
    #[error("model call failed: {0}")]
    ModelCall(String),

    /// The model returned something the engine could not use.
    #[error("unusable model response: {0}")]
    ModelResponse(String),

    /// Token encoder could not be constructed.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),
}

impl From<async_openai::error::OpenAIError> for Error {
    fn from(e: async_openai::error::OpenAIError) -> Self {
        Error::ModelCall(e.to_string())
    }
}

impl From<lancedb::error::Error> for Error {
    fn from(e: lancedb::error::Error) -> Self {
        Error::VectorStore(e.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
