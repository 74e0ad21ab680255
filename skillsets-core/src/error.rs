use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Command not found: {0} (is it installed and on PATH?)")]
    ToolNotFound(String),

    #[error("Command `{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Command `{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    #[error("Not a git repository: {0}")]
    NotARepository(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No data: {0}")]
    NoData(String),
}
