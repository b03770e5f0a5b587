//! # fedsq-client
//!
//! Client-side encoders for federated weight uploads.
//!
//! Key types:
//! - [`DiffSparseQuantEncoder`]: `trained - baseline * samples`, seeded sparsification, min/max quantization
//! - [`QuantEncoder`]: min/max quantization of a whole tensor
//! - [`RoundEncoder`]: encodes every tensor of a round against one mask, threading seed and cursor
//!
//! Encoders hold only immutable configuration. Build one per configuration
//! and pass it to whatever drives the upload; nothing here is global.

pub mod encoder;
pub mod quant;
pub mod round;

pub use encoder::{weight_diff, DiffSparseQuantEncoder};
pub use quant::QuantEncoder;
pub use round::{RoundEncoder, TensorUpdate};
