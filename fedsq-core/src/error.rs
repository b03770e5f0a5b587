use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Shape mismatch for {name}: trained has {trained} elements, baseline has {baseline}")]
    ShapeMismatch {
        name: String,
        trained: usize,
        baseline: usize,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Mask exhausted: {needed} entries requested at position {cursor}, mask length is {len}")]
    MaskExhausted {
        cursor: usize,
        needed: usize,
        len: usize,
    },
}
