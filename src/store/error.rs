use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cache store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt cache entry: {0}")]
    Corrupt(#[from] serde_json::Error),
}
