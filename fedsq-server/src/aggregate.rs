use crate::ReconstructedTensor;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregateError {
    #[error("Tensor {0} is not part of the global model")]
    UnknownTensor(String),
    #[error("Length mismatch for {name}: global model has {expected}, update has {actual}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Sample-weighted federated average over decoded client uploads.
///
/// Clients upload weights already multiplied by their sample count, so
/// accumulation is a plain sum; [`finish`](Self::finish) divides by the total
/// sample count.
#[derive(Debug, Clone)]
pub struct FedAvgAccumulator {
    names: Vec<String>,
    sums: Vec<Vec<f32>>,
    total_samples: u64,
    clients: usize,
}

impl FedAvgAccumulator {
    /// Zeroed sums shaped like the global model.
    pub fn new<'a, I>(shapes: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, usize)>,
    {
        let (names, sums) = shapes
            .into_iter()
            .map(|(name, len)| (name.to_string(), vec![0.0f32; len]))
            .unzip();
        Self {
            names,
            sums,
            total_samples: 0,
            clients: 0,
        }
    }

    pub fn clients(&self) -> usize {
        self.clients
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    /// Add one client's reconstructed tensors.
    ///
    /// Every tensor is checked before any sum is touched.
    pub fn add(
        &mut self,
        tensors: &[ReconstructedTensor],
        train_sample_count: u32,
    ) -> Result<(), AggregateError> {
        let mut slots = Vec::with_capacity(tensors.len());
        for t in tensors {
            let slot = self
                .names
                .iter()
                .position(|n| n == &t.name)
                .ok_or_else(|| AggregateError::UnknownTensor(t.name.clone()))?;
            if self.sums[slot].len() != t.weights.len() {
                return Err(AggregateError::LengthMismatch {
                    name: t.name.clone(),
                    expected: self.sums[slot].len(),
                    actual: t.weights.len(),
                });
            }
            slots.push(slot);
        }

        for (t, slot) in tensors.iter().zip(slots) {
            for (sum, &w) in self.sums[slot].iter_mut().zip(&t.weights) {
                *sum += w;
            }
        }
        self.total_samples += u64::from(train_sample_count);
        self.clients += 1;
        Ok(())
    }

    /// Averaged model, or `None` when no samples were contributed.
    pub fn finish(self) -> Option<Vec<ReconstructedTensor>> {
        if self.total_samples == 0 {
            info!("No training samples this round, skipping aggregation");
            return None;
        }

        let total = self.total_samples as f32;
        info!(
            "Aggregated {} clients over {} samples",
            self.clients, self.total_samples
        );
        Some(
            self.names
                .into_iter()
                .zip(self.sums)
                .map(|(name, sum)| ReconstructedTensor {
                    name,
                    weights: sum.into_iter().map(|s| s / total).collect(),
                })
                .collect(),
        )
    }
}
