//! # fedsq-core
//!
//! Shared building blocks of the federated update codec.
//!
//! - [`Quantizer`] / [`LinearQuantizer`]: min/max linear quantization to signed 8-bit codes
//! - [`MaskBuilder`] / [`SparseMask`] / [`MaskCursor`]: seeded keep-mask shared by client and server
//! - [`CompressedWeight`] / [`CompressType`]: per-tensor output record and its compression tag
//! - [`UploadCompressionConfig`]: round parameters agreed with the server
//! - [`RoundUpload`]: every compressed tensor of one round, in mask order

pub mod config;
pub mod error;
pub mod mask;
pub mod quantizer;
pub mod weight;

pub use config::{ConfigError, UploadCompressionConfig};
pub use error::CodecError;
pub use mask::{MaskBuilder, MaskCursor, SparseMask};
pub use quantizer::{LinearQuantizer, QuantizedBlock, Quantizer};
pub use weight::{CompressType, CompressedWeight, RoundUpload};
