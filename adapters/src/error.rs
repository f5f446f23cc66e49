#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("transaction {id} has no confirmed round")]
    MissingRound { id: String },

    #[error("box {name} value is {len} bytes, expected at least 8")]
    ShortBoxValue { name: String, len: usize },

    #[error("invalid base64 in {field}")]
    Base64 { field: &'static str },
}
