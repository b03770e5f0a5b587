use fedsq_core::{CodecError, CompressedWeight, LinearQuantizer, Quantizer};

/// Whole-tensor min/max quantizer ([`CompressType::Quant`](fedsq_core::CompressType::Quant)).
///
/// No difference, no mask: one code per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantEncoder {
    quantizer: LinearQuantizer,
}

impl QuantEncoder {
    pub fn new(num_bits: u8) -> Result<Self, CodecError> {
        Ok(Self {
            quantizer: LinearQuantizer::new(num_bits)?,
        })
    }

    pub fn encode(&self, name: &str, weights: &[f32]) -> CompressedWeight {
        CompressedWeight::new(name, self.quantizer.quantize(weights))
    }
}
