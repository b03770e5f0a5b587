//! Upload compression parameters
//!
//! These values must match what the server announced for the round: the
//! mask is rebuilt on the server from the same ratio and the round seed, and
//! codes are decoded with the same bit width.

use crate::{CodecError, CompressType, LinearQuantizer, MaskBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid compression config: {0}")]
    Invalid(#[from] CodecError),
}

fn default_upload_sparse_rate() -> f32 {
    0.4
}

fn default_num_bits() -> u8 {
    8
}

/// Compression settings for weight uploads.
///
/// ```
/// use fedsq_core::{CompressType, UploadCompressionConfig};
///
/// let yaml = r#"
/// compress_type: diff_sparse_quant
/// upload_sparse_rate: 0.1
/// "#;
///
/// let config = UploadCompressionConfig::from_yaml(yaml).unwrap();
/// assert_eq!(config.compress_type, CompressType::DiffSparseQuant);
/// assert_eq!(config.num_bits, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadCompressionConfig {
    #[serde(default)]
    pub compress_type: CompressType,
    /// Fraction of parameters retained by sparsification, in (0, 1]
    #[serde(default = "default_upload_sparse_rate")]
    pub upload_sparse_rate: f32,
    /// Quantization bit width, in [1, 8]
    #[serde(default = "default_num_bits")]
    pub num_bits: u8,
}

impl Default for UploadCompressionConfig {
    fn default() -> Self {
        Self {
            compress_type: CompressType::DiffSparseQuant,
            upload_sparse_rate: default_upload_sparse_rate(),
            num_bits: default_num_bits(),
        }
    }
}

impl UploadCompressionConfig {
    pub fn new(compress_type: CompressType, upload_sparse_rate: f32, num_bits: u8) -> Self {
        Self {
            compress_type,
            upload_sparse_rate,
            num_bits,
        }
    }

    /// Checks ratio and bit width without drawing from any seed.
    pub fn validate(&self) -> Result<(), CodecError> {
        MaskBuilder::new(self.upload_sparse_rate)?;
        LinearQuantizer::new(self.num_bits)?;
        Ok(())
    }

    /// Parses and validates a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
