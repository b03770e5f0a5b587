use crate::{DiffSparseQuantEncoder, QuantEncoder};
use fedsq_core::{
    CodecError, CompressType, MaskBuilder, MaskCursor, RoundUpload, UploadCompressionConfig,
};
use tracing::debug;

/// One tensor's contribution to a round: the locally trained sum and the
/// global weights the round started from.
#[derive(Debug, Clone, Copy)]
pub struct TensorUpdate<'a> {
    pub name: &'a str,
    pub trained: &'a [f32],
    pub baseline: &'a [f32],
}

impl<'a> TensorUpdate<'a> {
    pub fn new(name: &'a str, trained: &'a [f32], baseline: &'a [f32]) -> Self {
        Self {
            name,
            trained,
            baseline,
        }
    }

    /// Mask entries this tensor consumes.
    pub fn param_count(&self) -> usize {
        self.baseline.len()
    }
}

/// Encodes all tensors of a round in upload order.
///
/// A single mask is built over the summed parameter count and walked with
/// one cursor, so the server needs only the seed, the tensor order and the
/// tensor sizes to rebuild it.
///
/// # Seed handling
/// The caller owns the seed. [`encode_round`](Self::encode_round) returns the
/// advanced state on success; on error nothing is drawn that the caller
/// could observe, so retrying with the same seed reproduces the same mask.
#[derive(Debug, Clone)]
pub struct RoundEncoder {
    config: UploadCompressionConfig,
    mask_builder: MaskBuilder,
    diff_encoder: DiffSparseQuantEncoder,
    quant_encoder: QuantEncoder,
}

impl RoundEncoder {
    pub fn new(config: UploadCompressionConfig) -> Result<Self, CodecError> {
        let mask_builder = MaskBuilder::new(config.upload_sparse_rate)?;
        let diff_encoder = DiffSparseQuantEncoder::new(config.num_bits)?;
        let quant_encoder = QuantEncoder::new(config.num_bits)?;

        Ok(Self {
            config,
            mask_builder,
            diff_encoder,
            quant_encoder,
        })
    }

    pub fn config(&self) -> &UploadCompressionConfig {
        &self.config
    }

    /// Compress every tensor and return the upload with the next seed state.
    ///
    /// [`CompressType::Quant`] draws nothing and returns `seed` unchanged.
    /// [`CompressType::NoCompress`] uploads bypass this codec entirely.
    pub fn encode_round(
        &self,
        tensors: &[TensorUpdate<'_>],
        train_sample_count: u32,
        seed: i32,
    ) -> Result<(RoundUpload, i32), CodecError> {
        match self.config.compress_type {
            CompressType::DiffSparseQuant => {
                self.encode_diff_sparse_quant(tensors, train_sample_count, seed)
            }
            CompressType::Quant => {
                let weights = tensors
                    .iter()
                    .map(|t| self.quant_encoder.encode(t.name, t.trained))
                    .collect();
                Ok((
                    RoundUpload {
                        compress_type: CompressType::Quant,
                        weights,
                    },
                    seed,
                ))
            }
            CompressType::NoCompress => Err(CodecError::InvalidConfiguration(
                "no_compress uploads are sent raw and never reach the encoder".to_string(),
            )),
        }
    }

    fn encode_diff_sparse_quant(
        &self,
        tensors: &[TensorUpdate<'_>],
        train_sample_count: u32,
        seed: i32,
    ) -> Result<(RoundUpload, i32), CodecError> {
        // Reject bad shapes before paying for the shuffle
        for t in tensors {
            if t.trained.len() != t.baseline.len() {
                return Err(CodecError::ShapeMismatch {
                    name: t.name.to_string(),
                    trained: t.trained.len(),
                    baseline: t.baseline.len(),
                });
            }
        }

        let param_count: usize = tensors.iter().map(TensorUpdate::param_count).sum();
        let (mask, next_seed) = self.mask_builder.build(param_count, seed)?;
        debug!(
            "Round mask: {} of {} parameters retained across {} tensors",
            mask.retain_count(),
            param_count,
            tensors.len()
        );

        let mut cursor = MaskCursor::START;
        let mut weights = Vec::with_capacity(tensors.len());
        for t in tensors {
            let (weight, next) = self.diff_encoder.encode(
                t.name,
                t.trained,
                t.baseline,
                train_sample_count,
                &mask,
                cursor,
            )?;
            weights.push(weight);
            cursor = next;
        }
        debug_assert_eq!(cursor.position(), mask.len());

        let upload = RoundUpload {
            compress_type: CompressType::DiffSparseQuant,
            weights,
        };
        debug!(
            "Round encoded: {} bytes for {} parameters",
            upload.encoded_len(),
            param_count
        );
        Ok((upload, next_seed))
    }
}
