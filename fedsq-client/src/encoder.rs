use fedsq_core::{CodecError, CompressedWeight, LinearQuantizer, MaskCursor, Quantizer, SparseMask};
use tracing::trace;

/// Difference + sparsification + quantization encoder for one tensor.
///
/// # Pipeline
/// 1. `diff[i] = trained[i] - baseline[i] * train_sample_count` (the baseline
///    is scaled because the uploaded weights are a pre-aggregation sum)
/// 2. Keep `diff[i]` where `mask[cursor + i]` is set
/// 3. Quantize the kept values with [`LinearQuantizer`]
///
/// The cursor always advances by the tensor length, however many entries
/// were kept. The server walks the same mask with the same cursor
/// sequence, so tensors must be encoded in upload order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffSparseQuantEncoder {
    quantizer: LinearQuantizer,
}

impl DiffSparseQuantEncoder {
    pub fn new(num_bits: u8) -> Result<Self, CodecError> {
        Ok(Self {
            quantizer: LinearQuantizer::new(num_bits)?,
        })
    }

    pub fn num_bits(&self) -> u8 {
        self.quantizer.num_bits()
    }

    pub fn quantizer(&self) -> &LinearQuantizer {
        &self.quantizer
    }

    /// Encode one tensor against the mask window starting at `cursor`.
    ///
    /// Returns the compressed record and the cursor for the next tensor.
    pub fn encode(
        &self,
        name: &str,
        trained: &[f32],
        baseline: &[f32],
        train_sample_count: u32,
        mask: &SparseMask,
        cursor: MaskCursor,
    ) -> Result<(CompressedWeight, MaskCursor), CodecError> {
        let diffs = weight_diff(name, trained, baseline, train_sample_count)?;
        let window = mask.window(cursor, diffs.len())?;

        let kept: Vec<f32> = diffs
            .iter()
            .zip(window)
            .filter_map(|(&d, &keep)| keep.then_some(d))
            .collect();

        let block = self.quantizer.quantize(&kept);
        trace!(
            "Encoded {}: kept {} of {} values, range [{}, {}]",
            name,
            kept.len(),
            diffs.len(),
            block.min_value,
            block.max_value
        );

        Ok((
            CompressedWeight::new(name, block),
            cursor.advanced_by(diffs.len()),
        ))
    }
}

/// Element-wise `trained - baseline * train_sample_count`, in f32.
pub fn weight_diff(
    name: &str,
    trained: &[f32],
    baseline: &[f32],
    train_sample_count: u32,
) -> Result<Vec<f32>, CodecError> {
    if trained.len() != baseline.len() {
        return Err(CodecError::ShapeMismatch {
            name: name.to_string(),
            trained: trained.len(),
            baseline: baseline.len(),
        });
    }

    let samples = train_sample_count as f32;
    Ok(trained
        .iter()
        .zip(baseline)
        .map(|(&t, &b)| t - b * samples)
        .collect())
}
