use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("not an integer: {value}")]
    NotAnInteger { value: String },
    #[error("invalid strand direction '{value}', must be '+' or '-'")]
    InvalidStrand { value: String },
}
