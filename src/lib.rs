//! # fedsq
//!
//! Seeded sparsification and difference quantization for federated weight
//! uploads.
//!
//! A client subtracts the sample-scaled global model from its trained
//! weights, keeps the positions selected by a mask both sides rebuild from a
//! shared seed, and min/max quantizes what is left. The server rebuilds the
//! same mask and scatters the decoded values back.
//!
//! ```
//! use fedsq::client::{RoundEncoder, TensorUpdate};
//! use fedsq::core::UploadCompressionConfig;
//! use fedsq::server::{GlobalTensor, RoundDecoder};
//!
//! let config = UploadCompressionConfig::default();
//! let baseline = vec![0.5f32; 10];
//! let trained: Vec<f32> = (0..10).map(|i| i as f32 * 0.25 + 1.0).collect();
//!
//! let (upload, client_seed) = RoundEncoder::new(config.clone())
//!     .unwrap()
//!     .encode_round(&[TensorUpdate::new("w", &trained, &baseline)], 2, 42)
//!     .unwrap();
//! let (decoded, server_seed) = RoundDecoder::new(&config)
//!     .unwrap()
//!     .decode_round(&upload, &[GlobalTensor::new("w", &baseline)], 2, 42)
//!     .unwrap();
//!
//! assert_eq!(client_seed, server_seed);
//! assert_eq!(decoded[0].weights.len(), 10);
//! ```

pub mod logging;

pub use fedsq_client as client;
pub use fedsq_core as core;
pub use fedsq_math as math;
pub use fedsq_server as server;

pub use fedsq_core::{
    CodecError, CompressType, CompressedWeight, RoundUpload, UploadCompressionConfig,
};
