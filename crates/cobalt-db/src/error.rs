use cobalt_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("improperly configured: {0}")]
    Configuration(String),

    #[error("no target collection: call target_collection before execute")]
    NoTarget,

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("unsupported by the document store: {0}")]
    Unsupported(String),

    #[error("malformed query plan: {0}")]
    Structural(String),

    #[error("field error: {0}")]
    Field(String),

    #[error("programming error: {0}")]
    Programming(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
