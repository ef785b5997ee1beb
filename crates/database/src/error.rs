use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to acquire database connection: {0}")]
    Pool(String),

    #[error("query failed: {0}")]
    Query(#[from] tokio_postgres::Error),

    #[error("row had unrecognized value for {field}: {value}")]
    UnrecognizedEnum { field: &'static str, value: String },

    #[error("not found")]
    NotFound,
}

impl From<deadpool_postgres::PoolError> for RepositoryError {
    fn from(e: deadpool_postgres::PoolError) -> Self {
        RepositoryError::Pool(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
