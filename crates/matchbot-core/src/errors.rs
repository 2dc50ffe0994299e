use std::path::PathBuf;

/// Core error type for the bot.
///
/// User-input problems (unknown ids, malformed arguments, duplicate signups)
/// never become values of this type; they are answered over chat as response
/// lines. `Error` covers the fatal tier: configuration, I/O, and corruption
/// of the persisted match file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt data file {path}: {detail}")]
    DataFormat { path: PathBuf, detail: String },

    #[error("transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, Error>;
