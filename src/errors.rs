use std::str::Utf8Error;

/// Errors raised while decoding the legacy `consent` cookie.
///
/// These never escape the bridge: a record that fails to decode is treated as
/// if no record existed at all.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("consent record is not valid UTF-8 after percent-decoding: {0}")]
    Encoding(#[from] Utf8Error),

    #[error("consent record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryError {
    #[error("unknown consent category: {0}")]
    Unknown(String),
}
