use fedsq_core::{
    CodecError, CompressType, CompressedWeight, LinearQuantizer, MaskBuilder, MaskCursor,
    Quantizer, RoundUpload, SparseMask, UploadCompressionConfig,
};
use thiserror::Error;
use tracing::{debug, trace, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Payload mismatch for {name}: expected {expected} codes, got {actual}")]
    PayloadMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("Missing tensor in upload: {0}")]
    MissingTensor(String),
    #[error("Tensor order mismatch: expected {expected}, found {found}")]
    TensorOrder { expected: String, found: String },
    #[error("Unexpected tensor in upload: {0}")]
    UnexpectedTensor(String),
    #[error("Unsupported compress type: {0}")]
    UnsupportedCompressType(CompressType),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// A global-model tensor the round started from, in upload order.
#[derive(Debug, Clone, Copy)]
pub struct GlobalTensor<'a> {
    pub name: &'a str,
    pub weights: &'a [f32],
}

impl<'a> GlobalTensor<'a> {
    pub fn new(name: &'a str, weights: &'a [f32]) -> Self {
        Self { name, weights }
    }
}

/// One decoded tensor: the client's sample-weighted trained sum.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedTensor {
    pub name: String,
    pub weights: Vec<f32>,
}

/// Inverts [`CompressType::DiffSparseQuant`] for one tensor.
///
/// Dropped positions come back as a zero difference, so after adding the
/// scaled baseline they equal `baseline * train_sample_count` exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffSparseQuantDecoder {
    quantizer: LinearQuantizer,
}

impl DiffSparseQuantDecoder {
    pub fn new(num_bits: u8) -> Result<Self, CodecError> {
        Ok(Self {
            quantizer: LinearQuantizer::new(num_bits)?,
        })
    }

    /// Scatter the dequantized codes back into a dense difference of length
    /// `param_count`.
    pub fn decode_diff(
        &self,
        weight: &CompressedWeight,
        mask: &SparseMask,
        cursor: MaskCursor,
        param_count: usize,
    ) -> Result<(Vec<f32>, MaskCursor), DecodeError> {
        let window = mask.window(cursor, param_count)?;
        let expected = window.iter().filter(|&&b| b).count();
        if weight.payload.len() != expected {
            return Err(DecodeError::PayloadMismatch {
                name: weight.name.clone(),
                expected,
                actual: weight.payload.len(),
            });
        }

        let values = self
            .quantizer
            .dequantize(weight.min_value, weight.max_value, &weight.payload);
        let mut kept = values.into_iter();
        let diff = window
            .iter()
            .map(|&keep| if keep { kept.next().unwrap_or(0.0) } else { 0.0 })
            .collect();

        Ok((diff, cursor.advanced_by(param_count)))
    }

    /// `diff + baseline * train_sample_count`.
    pub fn reconstruct(
        &self,
        weight: &CompressedWeight,
        baseline: &[f32],
        train_sample_count: u32,
        mask: &SparseMask,
        cursor: MaskCursor,
    ) -> Result<(Vec<f32>, MaskCursor), DecodeError> {
        let (mut values, next) = self.decode_diff(weight, mask, cursor, baseline.len())?;
        let samples = train_sample_count as f32;
        for (v, &b) in values.iter_mut().zip(baseline) {
            *v += b * samples;
        }
        trace!("Reconstructed {} ({} values)", weight.name, values.len());
        Ok((values, next))
    }
}

/// Inverts [`CompressType::Quant`]: one code per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantDecoder {
    quantizer: LinearQuantizer,
}

impl QuantDecoder {
    pub fn new(num_bits: u8) -> Result<Self, CodecError> {
        Ok(Self {
            quantizer: LinearQuantizer::new(num_bits)?,
        })
    }

    pub fn decode(&self, weight: &CompressedWeight) -> Vec<f32> {
        self.quantizer
            .dequantize(weight.min_value, weight.max_value, &weight.payload)
    }
}

/// Server-side counterpart of the client's round encoder.
///
/// Rebuilds the round mask from the shared seed and the global tensor sizes,
/// then walks it with one cursor in upload order. The upload must list the
/// same tensors in the same order as `globals`.
#[derive(Debug, Clone)]
pub struct RoundDecoder {
    mask_builder: MaskBuilder,
    diff_decoder: DiffSparseQuantDecoder,
    quant_decoder: QuantDecoder,
}

impl RoundDecoder {
    pub fn new(config: &UploadCompressionConfig) -> Result<Self, CodecError> {
        Ok(Self {
            mask_builder: MaskBuilder::new(config.upload_sparse_rate)?,
            diff_decoder: DiffSparseQuantDecoder::new(config.num_bits)?,
            quant_decoder: QuantDecoder::new(config.num_bits)?,
        })
    }

    /// Decode every tensor and return them with the advanced seed state.
    ///
    /// On error the caller keeps its seed; nothing is committed.
    pub fn decode_round(
        &self,
        upload: &RoundUpload,
        globals: &[GlobalTensor<'_>],
        train_sample_count: u32,
        seed: i32,
    ) -> Result<(Vec<ReconstructedTensor>, i32), DecodeError> {
        check_tensor_order(upload, globals)?;

        match upload.compress_type {
            CompressType::DiffSparseQuant => {
                let param_count: usize = globals.iter().map(|g| g.weights.len()).sum();
                let (mask, next_seed) = self.mask_builder.build(param_count, seed)?;
                debug!(
                    "Rebuilt round mask: {} of {} parameters retained",
                    mask.retain_count(),
                    param_count
                );

                let mut cursor = MaskCursor::START;
                let mut tensors = Vec::with_capacity(globals.len());
                for (weight, global) in upload.weights.iter().zip(globals) {
                    let (weights, next) = self.diff_decoder.reconstruct(
                        weight,
                        global.weights,
                        train_sample_count,
                        &mask,
                        cursor,
                    )?;
                    tensors.push(ReconstructedTensor {
                        name: weight.name.clone(),
                        weights,
                    });
                    cursor = next;
                }
                Ok((tensors, next_seed))
            }
            CompressType::Quant => {
                let mut tensors = Vec::with_capacity(globals.len());
                for (weight, global) in upload.weights.iter().zip(globals) {
                    if weight.payload.len() != global.weights.len() {
                        return Err(DecodeError::PayloadMismatch {
                            name: weight.name.clone(),
                            expected: global.weights.len(),
                            actual: weight.payload.len(),
                        });
                    }
                    tensors.push(ReconstructedTensor {
                        name: weight.name.clone(),
                        weights: self.quant_decoder.decode(weight),
                    });
                }
                Ok((tensors, seed))
            }
            CompressType::NoCompress => {
                warn!("Raw upload routed to the round decoder");
                Err(DecodeError::UnsupportedCompressType(CompressType::NoCompress))
            }
        }
    }
}

fn check_tensor_order(upload: &RoundUpload, globals: &[GlobalTensor<'_>]) -> Result<(), DecodeError> {
    for (weight, global) in upload.weights.iter().zip(globals) {
        if weight.name != global.name {
            return Err(DecodeError::TensorOrder {
                expected: global.name.to_string(),
                found: weight.name.clone(),
            });
        }
    }

    if let Some(missing) = globals.get(upload.weights.len()) {
        return Err(DecodeError::MissingTensor(missing.name.to_string()));
    }
    if let Some(extra) = upload.weights.get(globals.len()) {
        return Err(DecodeError::UnexpectedTensor(extra.name.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weight(name: &str, min_value: f32, max_value: f32, payload: Vec<i8>) -> CompressedWeight {
        CompressedWeight {
            name: name.to_string(),
            min_value,
            max_value,
            payload,
        }
    }

    #[test]
    fn test_decode_golden_diff() {
        // Mask (10, 42, 0.5) keeps 0, 1, 3, 4, 5
        let (mask, _) = MaskBuilder::new(0.5).unwrap().build(10, 42).unwrap();
        let w = weight("w", 0.0, 1.25, vec![-128, -77, 25, 76, 127]);
        let decoder = DiffSparseQuantDecoder::new(8).unwrap();

        let (diff, cursor) = decoder.decode_diff(&w, &mask, MaskCursor::START, 10).unwrap();
        assert_eq!(diff, vec![0.0, 0.25, 0.0, 0.75, 1.0, 1.25, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(cursor.position(), 10);
    }

    #[test]
    fn test_reconstruct_adds_scaled_baseline() {
        let (mask, _) = MaskBuilder::new(0.5).unwrap().build(10, 42).unwrap();
        let w = weight("w", 0.0, 1.25, vec![-128, -77, 25, 76, 127]);
        let decoder = DiffSparseQuantDecoder::new(8).unwrap();

        let (values, _) = decoder
            .reconstruct(&w, &[0.5; 10], 2, &mask, MaskCursor::START)
            .unwrap();
        assert_eq!(values, vec![1.0, 1.25, 1.0, 1.75, 2.0, 2.25, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_payload_mismatch() {
        let mask = SparseMask::from_bits(vec![true, false, true]);
        let decoder = DiffSparseQuantDecoder::new(8).unwrap();
        let err = decoder
            .decode_diff(&weight("b", 0.0, 1.0, vec![0]), &mask, MaskCursor::START, 3)
            .unwrap_err();
        assert_eq!(
            err,
            DecodeError::PayloadMismatch {
                name: "b".to_string(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_mask_exhausted_propagates() {
        let mask = SparseMask::from_bits(vec![true; 2]);
        let decoder = DiffSparseQuantDecoder::new(8).unwrap();
        let err = decoder
            .decode_diff(&weight("b", 0.0, 0.0, vec![]), &mask, MaskCursor::new(1), 2)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Codec(CodecError::MaskExhausted { .. })));
    }

    #[test]
    fn test_constant_block_decodes_exactly() {
        let decoder = QuantDecoder::new(8).unwrap();
        assert_eq!(decoder.decode(&weight("c", 3.0, 3.0, vec![-128, -128])), vec![3.0, 3.0]);
    }

    #[test]
    fn test_tensor_order_checks() {
        let a = [0.0f32; 2];
        let b = [0.0f32; 3];
        let globals = [GlobalTensor::new("a", &a), GlobalTensor::new("b", &b)];
        let decoder = RoundDecoder::new(&UploadCompressionConfig::default()).unwrap();

        let upload = |names: &[&str]| RoundUpload {
            compress_type: CompressType::DiffSparseQuant,
            weights: names.iter().map(|n| weight(n, 0.0, 0.0, vec![])).collect(),
        };

        assert_eq!(
            decoder.decode_round(&upload(&["b", "a"][..]), &globals, 1, 42).unwrap_err(),
            DecodeError::TensorOrder {
                expected: "a".to_string(),
                found: "b".to_string()
            }
        );
        assert_eq!(
            decoder.decode_round(&upload(&["a"][..]), &globals, 1, 42).unwrap_err(),
            DecodeError::MissingTensor("b".to_string())
        );
        assert_eq!(
            decoder.decode_round(&upload(&["a", "b", "c"][..]), &globals, 1, 42).unwrap_err(),
            DecodeError::UnexpectedTensor("c".to_string())
        );
    }

    #[test]
    fn test_no_compress_unsupported() {
        let decoder = RoundDecoder::new(&UploadCompressionConfig::default()).unwrap();
        let upload = RoundUpload {
            compress_type: CompressType::NoCompress,
            weights: vec![],
        };
        assert_eq!(
            decoder.decode_round(&upload, &[], 1, 0).unwrap_err(),
            DecodeError::UnsupportedCompressType(CompressType::NoCompress)
        );
    }

    #[test]
    fn test_quant_round_keeps_seed() {
        let g = [0.0f32; 2];
        let globals = [GlobalTensor::new("g", &g)];
        let decoder = RoundDecoder::new(&UploadCompressionConfig::default()).unwrap();
        let upload = RoundUpload {
            compress_type: CompressType::Quant,
            weights: vec![weight("g", 3.0, 3.0, vec![-128, -128])],
        };

        let (tensors, seed) = decoder.decode_round(&upload, &globals, 9, 77).unwrap();
        assert_eq!(seed, 77);
        assert_eq!(tensors[0].weights, vec![3.0, 3.0]);
    }
}
