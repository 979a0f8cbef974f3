use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Unknown play mode {0}")]
    UnknownMode(i32),

    #[error("Unknown variant {0}")]
    UnknownVariant(i32),

    /// Raised by stores that refuse a statement without talking to postgres
    #[error("Write rejected: {0}")]
    Rejected(String)
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError)
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Write dispatcher is closed")]
    Closed
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{0} is unavailable")]
    Unavailable(&'static str)
}
