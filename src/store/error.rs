use thiserror::Error;

/// Any failure from the backing SQLite store, carrying the engine
/// diagnostic and the operation it happened in. The design makes no
/// transient/permanent distinction.
#[derive(Debug, Error)]
#[error("sqlite error in {operation}: {source}")]
pub struct StoreError {
    pub operation: &'static str,
    #[source]
    pub source: rusqlite::Error,
}

impl StoreError {
    pub(crate) fn wrap(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> StoreError {
        move |source| StoreError { operation, source }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
