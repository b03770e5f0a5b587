use anyhow::{Context, Result};
use clap::Parser;
use fedsq::client::{RoundEncoder, TensorUpdate};
use fedsq::core::{CompressType, UploadCompressionConfig};
use fedsq::logging::{init_logging, LogLevel};
use fedsq::server::{GlobalTensor, RoundDecoder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Encode and decode synthetic federated rounds")]
struct Args {
    /// Tensor sizes, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [4096usize, 64, 1024, 10])]
    tensors: Vec<usize>,

    /// Shared round seed (client and server must agree)
    #[arg(long, default_value_t = 42, allow_hyphen_values = true)]
    seed: i32,

    /// Fraction of parameters uploaded per round
    #[arg(long, default_value_t = 0.4)]
    sparse_rate: f32,

    /// Quantization bit width, 1 to 8
    #[arg(long, default_value_t = 8)]
    num_bits: u8,

    /// Training samples behind each upload
    #[arg(long, default_value_t = 32)]
    train_samples: u32,

    /// Number of rounds to chain
    #[arg(long, default_value_t = 3)]
    rounds: usize,

    /// Seed for the synthetic weights
    #[arg(long, default_value_t = 7)]
    data_seed: u64,

    /// YAML compression config (overrides --sparse-rate and --num-bits)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the last round's upload here
    #[arg(long)]
    output: Option<PathBuf>,

    /// trace, debug, info, warn or error
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level: LogLevel = args.log_level.parse().map_err(anyhow::Error::msg)?;
    init_logging(level);

    let config = match args.config.as_ref() {
        Some(path) => UploadCompressionConfig::from_yaml_file(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => {
            let config = UploadCompressionConfig::new(
                CompressType::DiffSparseQuant,
                args.sparse_rate,
                args.num_bits,
            );
            config.validate().context("validate arguments")?;
            config
        }
    };
    info!(
        "Config: {} rate={} bits={}",
        config.compress_type, config.upload_sparse_rate, config.num_bits
    );

    let encoder = RoundEncoder::new(config.clone()).context("build encoder")?;
    let decoder = RoundDecoder::new(&config).context("build decoder")?;

    let names: Vec<String> = (0..args.tensors.len())
        .map(|i| format!("layer{}.weight", i))
        .collect();
    let mut rng = StdRng::seed_from_u64(args.data_seed);
    let mut globals: Vec<Vec<f32>> = args
        .tensors
        .iter()
        .map(|&n| (0..n).map(|_| rng.gen_range(-0.5f32..0.5)).collect())
        .collect();

    let samples = args.train_samples as f32;
    let param_count: usize = args.tensors.iter().sum();
    let mut client_seed = args.seed;
    let mut server_seed = args.seed;
    let mut last_upload = None;

    for round in 0..args.rounds {
        let trained: Vec<Vec<f32>> = globals
            .iter()
            .map(|g| {
                g.iter()
                    .map(|&w| (w + rng.gen_range(-0.05f32..0.05)) * samples)
                    .collect()
            })
            .collect();

        let updates: Vec<_> = names
            .iter()
            .zip(&trained)
            .zip(&globals)
            .map(|((n, t), g)| TensorUpdate::new(n, t, g))
            .collect();
        let (upload, next_client) = encoder
            .encode_round(&updates, args.train_samples, client_seed)
            .with_context(|| format!("encode round {}", round))?;

        let views: Vec<_> = names
            .iter()
            .zip(&globals)
            .map(|(n, g)| GlobalTensor::new(n, g))
            .collect();
        let (decoded, next_server) = decoder
            .decode_round(&upload, &views, args.train_samples, server_seed)
            .with_context(|| format!("decode round {}", round))?;

        if next_client != next_server {
            anyhow::bail!("seed drift in round {}: {} vs {}", round, next_client, next_server);
        }
        client_seed = next_client;
        server_seed = next_server;

        let mut max_abs_err = 0.0f32;
        for (t, d) in trained.iter().zip(&decoded) {
            for (&a, &b) in t.iter().zip(&d.weights) {
                max_abs_err = max_abs_err.max((a - b).abs() / samples);
            }
        }

        let raw = param_count * 4;
        let compressed = upload.encoded_len();
        println!(
            "Round {}: {} -> {} bytes ({:.2}x), max per-sample error {:.4e}, next seed {}",
            round,
            raw,
            compressed,
            raw as f64 / compressed.max(1) as f64,
            max_abs_err,
            client_seed
        );

        globals = decoded
            .into_iter()
            .map(|t| t.weights.into_iter().map(|w| w / samples).collect())
            .collect();
        last_upload = Some(upload);
    }

    if let (Some(path), Some(upload)) = (args.output.as_ref(), last_upload.as_ref()) {
        let bytes = upload.to_bytes().map_err(anyhow::Error::msg)?;
        std::fs::write(path, &bytes).with_context(|| format!("write {}", path.display()))?;
        println!("Wrote {} bytes to {}", bytes.len(), path.display());
    }

    Ok(())
}
