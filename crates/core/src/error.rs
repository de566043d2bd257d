use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("syntax error at column {column}: {message}")]
    Syntax { column: usize, message: String },

    #[error("invalid escape sequence: {0}")]
    InvalidEscape(String),
}

impl CoreError {
    pub fn syntax(column: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            column,
            message: message.into(),
        }
    }
}
