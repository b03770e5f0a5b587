use crate::{CodecError, QuantizedBlock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compression kind tag carried next to every uploaded or downloaded tensor.
///
/// The numeric tags are the values used on the wire; a decoder selects its
/// inverse transform from them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CompressType {
    /// Raw f32 weights, the codec is bypassed
    NoCompress = 0,
    /// Difference to the scaled baseline, seeded sparsification, quantization
    #[default]
    DiffSparseQuant = 1,
    /// Quantization of the full tensor only
    Quant = 2,
}

impl CompressType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::NoCompress),
            1 => Some(Self::DiffSparseQuant),
            2 => Some(Self::Quant),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoCompress => "no_compress",
            Self::DiffSparseQuant => "diff_sparse_quant",
            Self::Quant => "quant",
        }
    }
}

impl fmt::Display for CompressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "no_compress" => Ok(Self::NoCompress),
            "diff_sparse_quant" => Ok(Self::DiffSparseQuant),
            "quant" => Ok(Self::Quant),
            _ => Err(CodecError::InvalidConfiguration(format!(
                "unknown compress type: {}",
                s
            ))),
        }
    }
}

/// One compressed tensor, as handed to the transport layer.
///
/// For [`CompressType::DiffSparseQuant`] the payload holds one code per
/// retained mask entry of the tensor's window; for [`CompressType::Quant`]
/// one code per element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedWeight {
    /// Fully qualified parameter name
    pub name: String,
    pub min_value: f32,
    pub max_value: f32,
    pub payload: Vec<i8>,
}

impl CompressedWeight {
    pub fn new(name: impl Into<String>, block: QuantizedBlock) -> Self {
        Self {
            name: name.into(),
            min_value: block.min_value,
            max_value: block.max_value,
            payload: block.codes,
        }
    }

    /// Upload size: payload plus the two f32 bounds.
    pub fn encoded_len(&self) -> usize {
        self.payload.len() + 2 * std::mem::size_of::<f32>()
    }

    /// Serialize to bytes for local storage or caching.
    pub fn to_bytes(&self) -> Result<Vec<u8>, String> {
        bincode::serialize(self).map_err(|e| format!("Serialization error: {}", e))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        bincode::deserialize(bytes).map_err(|e| format!("Deserialization error: {}", e))
    }
}

/// Every compressed tensor of one round, in mask order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundUpload {
    pub compress_type: CompressType,
    pub weights: Vec<CompressedWeight>,
}

impl RoundUpload {
    pub fn encoded_len(&self) -> usize {
        self.weights.iter().map(CompressedWeight::encoded_len).sum()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, String> {
        bincode::serialize(self).map_err(|e| format!("Serialization error: {}", e))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        bincode::deserialize(bytes).map_err(|e| format!("Deserialization error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags() {
        for ty in [CompressType::NoCompress, CompressType::DiffSparseQuant, CompressType::Quant] {
            assert_eq!(CompressType::from_tag(ty.tag()), Some(ty));
            assert_eq!(ty.as_str().parse::<CompressType>().unwrap(), ty);
        }
        assert_eq!(CompressType::DiffSparseQuant.tag(), 1);
        assert_eq!(CompressType::from_tag(7), None);
        assert!("zstd".parse::<CompressType>().is_err());
        assert_eq!(CompressType::default(), CompressType::DiffSparseQuant);
    }

    #[test]
    fn test_display_matches_config_spelling() {
        assert_eq!(CompressType::DiffSparseQuant.to_string(), "diff_sparse_quant");
        assert_eq!("QUANT".parse::<CompressType>().unwrap(), CompressType::Quant);
    }

    #[test]
    fn test_weight_from_block() {
        let w = CompressedWeight::new(
            "fc1.weight",
            QuantizedBlock {
                min_value: -1.0,
                max_value: 1.0,
                codes: vec![-128, -1, 127],
            },
        );
        assert_eq!(w.name, "fc1.weight");
        assert_eq!(w.payload, vec![-128, -1, 127]);
        assert_eq!(w.encoded_len(), 3 + 8);
    }

    #[test]
    fn test_serialization() {
        let upload = RoundUpload {
            compress_type: CompressType::DiffSparseQuant,
            weights: vec![CompressedWeight {
                name: "conv1.bias".to_string(),
                min_value: -0.5,
                max_value: 0.25,
                payload: vec![-128, 0, 127, 5],
            }],
        };

        let bytes = upload.to_bytes().unwrap();
        let restored = RoundUpload::from_bytes(&bytes).unwrap();
        assert_eq!(restored, upload);

        let w = &upload.weights[0];
        assert_eq!(&CompressedWeight::from_bytes(&w.to_bytes().unwrap()).unwrap(), w);
    }

    #[test]
    fn test_from_bytes_garbage() {
        assert!(CompressedWeight::from_bytes(&[0xFF]).is_err());
    }
}
