use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid signaling frame: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing or empty field `{0}`")]
    MissingField(&'static str),

    #[error("`{field}` must be {expected}, got {actual}")]
    WrongDescription {
        field: &'static str,
        expected: &'static str,
        actual: String,
    },
}
