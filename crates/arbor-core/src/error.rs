pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid tree document: {message}")]
    InvalidTree { message: String },

    #[error("Invalid config value at `{path}`: {message}")]
    InvalidConfig { path: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
