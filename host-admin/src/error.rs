#[derive(thiserror::Error, Debug)]
pub enum AdminError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Aborted(String),

    #[error("`{command}` failed: {status}")]
    CommandFailed { command: String, status: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("`{program}` is not installed; rerun with --install-packages or install it with dnf")]
    MissingProgram { program: String },
}

pub type Result<T> = std::result::Result<T, AdminError>;
