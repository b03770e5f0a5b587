use crate::CodecError;
use fedsq_math::{narrow_to_i8, round_half_up};
use serde::{Deserialize, Serialize};

/// Added to every scale so a constant block never divides by zero.
pub const SCALE_EPSILON: f32 = 1e-10;

/// Widest code that still fits the signed 8-bit payload.
pub const MAX_BITS: u8 = 8;

/// Quantized values plus the bounds needed to invert them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizedBlock {
    pub min_value: f32,
    pub max_value: f32,
    pub codes: Vec<i8>,
}

/// Quantizer interface shared by the upload encoders and the server decoders.
///
/// Determinism: implementations must be pure functions of their inputs and
/// configuration. The server re-derives values from `(min, max, codes)` only,
/// so `dequantize` may not depend on anything `quantize` saw besides those.
pub trait Quantizer {
    fn quantize(&self, values: &[f32]) -> QuantizedBlock;
    fn dequantize(&self, min_value: f32, max_value: f32, codes: &[i8]) -> Vec<f32>;
}

/// Min/max linear quantizer.
///
/// ```text
/// levels = 2^bits - 1
/// offset = 2^(bits - 1)
/// scale  = (max - min) / levels + SCALE_EPSILON
/// code   = round_half_up((v - min) / scale - offset)      in [-offset, offset - 1]
/// v'     = (code + offset) * scale + min                  |v - v'| <= scale / 2
/// ```
///
/// All arithmetic is f32 so codes match peers bit for bit.
///
/// # Example
/// ```
/// use fedsq_core::{LinearQuantizer, Quantizer};
///
/// let q = LinearQuantizer::new(8).unwrap();
/// let block = q.quantize(&[-1.0, 0.0, 1.0]);
/// assert_eq!((block.min_value, block.max_value), (-1.0, 1.0));
/// // (0 - min) / scale - 128 evaluates to -0.5000076 in f32
/// assert_eq!(block.codes, vec![-128, -1, 127]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearQuantizer {
    num_bits: u8,
}

impl LinearQuantizer {
    pub fn new(num_bits: u8) -> Result<Self, CodecError> {
        if num_bits == 0 || num_bits > MAX_BITS {
            return Err(CodecError::InvalidConfiguration(format!(
                "quantization bit width must be in [1, {}], got {}",
                MAX_BITS, num_bits
            )));
        }
        Ok(Self { num_bits })
    }

    pub fn num_bits(&self) -> u8 {
        self.num_bits
    }

    pub fn levels(&self) -> f32 {
        (1u32 << self.num_bits) as f32 - 1.0
    }

    /// Half the code range; subtracted so codes are centred on zero.
    pub fn offset(&self) -> f32 {
        (1u32 << (self.num_bits - 1)) as f32
    }

    pub fn scale(&self, min_value: f32, max_value: f32) -> f32 {
        (max_value - min_value) / self.levels() + SCALE_EPSILON
    }

    #[inline]
    pub fn encode_value(&self, value: f32, min_value: f32, scale: f32) -> i8 {
        narrow_to_i8(round_half_up((value - min_value) / scale - self.offset()))
    }

    #[inline]
    pub fn decode_value(&self, code: i8, min_value: f32, scale: f32) -> f32 {
        (f32::from(code) + self.offset()) * scale + min_value
    }
}

impl Quantizer for LinearQuantizer {
    fn quantize(&self, values: &[f32]) -> QuantizedBlock {
        let (min_value, max_value) = value_range(values);
        let scale = self.scale(min_value, max_value);
        let codes = values
            .iter()
            .map(|&v| self.encode_value(v, min_value, scale))
            .collect();

        QuantizedBlock {
            min_value,
            max_value,
            codes,
        }
    }

    fn dequantize(&self, min_value: f32, max_value: f32, codes: &[i8]) -> Vec<f32> {
        let scale = self.scale(min_value, max_value);
        codes
            .iter()
            .map(|&c| self.decode_value(c, min_value, scale))
            .collect()
    }
}

/// Smallest and largest value; `(0.0, 0.0)` for an empty slice.
pub fn value_range(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }

    let mut min_value = f32::MAX;
    let mut max_value = -f32::MAX;
    for &v in values {
        if v < min_value {
            min_value = v;
        }
        if v > max_value {
            max_value = v;
        }
    }
    (min_value, max_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_bit_widths() {
        assert!(matches!(
            LinearQuantizer::new(0),
            Err(CodecError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            LinearQuantizer::new(9),
            Err(CodecError::InvalidConfiguration(_))
        ));
        for bits in 1..=8 {
            assert!(LinearQuantizer::new(bits).is_ok());
        }
    }

    #[test]
    fn test_symmetric_scenario() {
        let q = LinearQuantizer::new(8).unwrap();
        let block = q.quantize(&[-1.0, 0.0, 1.0]);

        assert_eq!(block.min_value, -1.0);
        assert_eq!(block.max_value, 1.0);
        assert_eq!(q.scale(-1.0, 1.0), 2.0 / 255.0 + 1e-10);
        assert_eq!(block.codes, vec![-128, -1, 127]);
    }

    #[test]
    fn test_four_bit_codes() {
        let q = LinearQuantizer::new(4).unwrap();
        let block = q.quantize(&[0.0, 0.25, 0.75, 1.0, 1.25]);
        assert_eq!(block.codes, vec![-8, -5, 1, 4, 7]);
        assert_eq!(q.offset(), 8.0);
        assert_eq!(q.levels(), 15.0);
    }

    #[test]
    fn test_exact_dyadic_roundtrip() {
        let q = LinearQuantizer::new(8).unwrap();
        let values = [0.0, 0.25, 0.75, 1.0, 1.25];
        let block = q.quantize(&values);
        assert_eq!(block.codes, vec![-128, -77, 25, 76, 127]);

        let recon = q.dequantize(block.min_value, block.max_value, &block.codes);
        assert_eq!(recon, values.to_vec());
    }

    #[test]
    fn test_empty_block() {
        let q = LinearQuantizer::new(8).unwrap();
        let block = q.quantize(&[]);
        assert_eq!(block.min_value, 0.0);
        assert_eq!(block.max_value, 0.0);
        assert!(block.codes.is_empty());
        assert!(q.dequantize(0.0, 0.0, &[]).is_empty());
    }

    #[test]
    fn test_constant_block() {
        // Zero-width range: the epsilon scale keeps every code at -offset
        let q = LinearQuantizer::new(8).unwrap();
        let block = q.quantize(&[3.0, 3.0, 3.0]);
        assert_eq!(block.min_value, 3.0);
        assert_eq!(block.max_value, 3.0);
        assert_eq!(block.codes, vec![-128, -128, -128]);

        let recon = q.dequantize(block.min_value, block.max_value, &block.codes);
        assert_eq!(recon, vec![3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_value_range() {
        assert_eq!(value_range(&[2.0, -3.5, 0.0, 7.25]), (-3.5, 7.25));
        assert_eq!(value_range(&[1.5]), (1.5, 1.5));
        assert_eq!(value_range(&[]), (0.0, 0.0));
    }
}
