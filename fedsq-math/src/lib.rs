//! # fedsq-math
//!
//! Bit-exact arithmetic shared by both ends of a compressed weight upload.
//!
//! This crate provides [`DeterministicSequence`], a seeded linear-congruential
//! generator whose state is a wrapping 32-bit signed integer, and
//! [`round_half_up`], the rounding rule quantization codes are produced with.
//! Client and server derive their sparsification masks from this crate alone,
//! so any change here desynchronizes peers.
//!
//! **Zero external dependencies**: auditable in isolation.

pub mod rounding;
pub mod sequence;

pub use rounding::{narrow_to_i8, round_half_up};
pub use sequence::{advance, prime, step, DeterministicSequence};
