pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Input not found: {path}")]
    InputNotFound { path: String },

    #[error("Failed to read {path}: {source}")]
    ReadInput {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Input is empty: {origin}")]
    EmptyInput { origin: String },

    #[error("Malformed input ({origin}): {message}")]
    MalformedInput { origin: String, message: String },

    #[error("No test-result nodes found in {origin}")]
    StructuralEmpty { origin: String },

    #[error("Duplicate canonical key `{key}` in {origin}")]
    DuplicateKey { origin: String, key: String },
}

impl Error {
    /// Process exit code for the extractor entry points.
    ///
    /// `1` covers inputs that could not be read or parsed; `2` covers inputs that parsed but
    /// yield no meaningful record array.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InputNotFound { .. }
            | Error::ReadInput { .. }
            | Error::EmptyInput { .. }
            | Error::MalformedInput { .. } => 1,
            Error::StructuralEmpty { .. } | Error::DuplicateKey { .. } => 2,
        }
    }
}
