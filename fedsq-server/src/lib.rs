//! # fedsq-server
//!
//! Server-side decoding of compressed weight uploads.
//!
//! Key types:
//! - [`RoundDecoder`]: rebuilds the round mask from the shared seed and decodes every tensor in order
//! - [`DiffSparseQuantDecoder`] / [`QuantDecoder`]: per-tensor inverses of the client encoders
//! - [`FedAvgAccumulator`]: sample-weighted average over the decoded uploads
//!
//! The server never receives the mask. It must see the same seed, tensor
//! order and tensor sizes as the client, or decoding fails or silently
//! misplaces values.

pub mod aggregate;
pub mod decoder;

pub use aggregate::{AggregateError, FedAvgAccumulator};
pub use decoder::{
    DecodeError, DiffSparseQuantDecoder, GlobalTensor, QuantDecoder, ReconstructedTensor,
    RoundDecoder,
};
