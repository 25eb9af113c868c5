use thiserror::Error;

/// Errors surfaced by store operations. Oracle unavailability and malformed
/// oracle output are not represented here: the proposer recovers both
/// locally through its fallback chain and callers never see them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("impressions must be greater than 0")]
    InvalidMetrics,

    #[error("post {0} not found")]
    PostNotFound(i32),

    #[error("store integrity error: {0}")]
    Integrity(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}
