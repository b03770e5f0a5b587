use crate::CodecError;
use fedsq_math::DeterministicSequence;
use serde::{Deserialize, Serialize};

/// Keep/drop decision per parameter position for one communication round.
///
/// The mask is never transmitted. Client and server each rebuild it from the
/// round seed and the total parameter count, so the pair
/// `(seed, param_count)` fully determines which positions are uploaded:
/// - **retained** positions carry a quantized code in the payload
/// - **dropped** positions are reconstructed as a zero difference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseMask {
    bits: Vec<bool>,
    retain_count: usize,
}

impl SparseMask {
    /// Wrap an explicit keep pattern (e.g. one received out of band).
    pub fn from_bits(bits: Vec<bool>) -> Self {
        let retain_count = bits.iter().filter(|&&b| b).count();
        Self { bits, retain_count }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of `true` entries.
    pub fn retain_count(&self) -> usize {
        self.retain_count
    }

    pub fn is_retained(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }

    /// Positions of all retained entries, ascending.
    pub fn retained_indices(&self) -> Vec<usize> {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect()
    }

    /// The `len` entries starting at `cursor`.
    pub fn window(&self, cursor: MaskCursor, len: usize) -> Result<&[bool], CodecError> {
        let start = cursor.position();
        let exhausted = || CodecError::MaskExhausted {
            cursor: start,
            needed: len,
            len: self.bits.len(),
        };
        let end = start.checked_add(len).ok_or_else(exhausted)?;
        self.bits.get(start..end).ok_or_else(exhausted)
    }

    /// Fraction of positions retained.
    pub fn density(&self) -> f32 {
        if self.bits.is_empty() {
            0.0
        } else {
            self.retain_count as f32 / self.bits.len() as f32
        }
    }
}

/// Forward-only position in a [`SparseMask`].
///
/// Every encode or decode call takes the cursor by value and returns it
/// advanced by the tensor's parameter count, so tensors of one round
/// partition the mask contiguously in upload order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MaskCursor(usize);

impl MaskCursor {
    pub const START: Self = Self(0);

    pub fn new(position: usize) -> Self {
        Self(position)
    }

    pub fn position(self) -> usize {
        self.0
    }

    #[must_use]
    pub fn advanced_by(self, count: usize) -> Self {
        Self(self.0 + count)
    }
}

/// Builds the round's [`SparseMask`] from a seed.
///
/// # Algorithm
/// 1. `retain = floor(param_count * retain_ratio)` (f32 product, truncated)
/// 2. Fill positions `[0, retain)` with `true`, the rest with `false`
/// 3. For `i` in `0..param_count`: draw `r` from the seeded sequence,
///    `j = floor(r * (param_count - i)) + i`, swap `i` and `j`
///
/// The full pass always runs, even when every entry is equal, so the seed
/// state handed back after a build does not depend on the ratio.
///
/// # Example
/// ```
/// use fedsq_core::MaskBuilder;
///
/// let builder = MaskBuilder::new(0.5).unwrap();
/// let (mask, _next_seed) = builder.build(10, 42).unwrap();
///
/// assert_eq!(mask.retain_count(), 5);
/// assert_eq!(mask.retained_indices(), vec![0, 1, 3, 4, 5]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskBuilder {
    retain_ratio: f32,
}

impl MaskBuilder {
    /// Fails for ratios outside `(0, 1]`; nothing is drawn from any seed.
    pub fn new(retain_ratio: f32) -> Result<Self, CodecError> {
        if !(retain_ratio > 0.0 && retain_ratio <= 1.0) {
            return Err(CodecError::InvalidConfiguration(format!(
                "retain ratio must be in (0, 1], got {}",
                retain_ratio
            )));
        }
        Ok(Self { retain_ratio })
    }

    pub fn retain_ratio(&self) -> f32 {
        self.retain_ratio
    }

    pub fn retain_count(&self, param_count: usize) -> usize {
        ((param_count as f32 * self.retain_ratio) as usize).min(param_count)
    }

    /// Build the mask and return it with the advanced seed state.
    ///
    /// The returned state continues the sequence (resume with
    /// [`DeterministicSequence::resume`]); it is not a fresh seed.
    pub fn build(&self, param_count: usize, seed: i32) -> Result<(SparseMask, i32), CodecError> {
        if param_count > i32::MAX as usize {
            return Err(CodecError::InvalidConfiguration(format!(
                "parameter count {} exceeds the 32-bit range peers index with",
                param_count
            )));
        }

        let retain_count = self.retain_count(param_count);
        let mut bits = vec![false; param_count];
        bits[..retain_count].fill(true);

        let mut sequence = DeterministicSequence::from_seed(seed);
        for i in 0..param_count {
            let rand = sequence.next_value();
            let j = (rand * (param_count - i) as f64) as usize + i;
            bits.swap(i, j);
        }

        Ok((SparseMask { bits, retain_count }, sequence.state()))
    }
}
