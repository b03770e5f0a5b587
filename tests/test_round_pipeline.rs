// Integration test for the full upload pipeline (encode round → bytes → decode round)
use fedsq::client::{RoundEncoder, TensorUpdate};
use fedsq::core::{CodecError, CompressType, MaskBuilder, RoundUpload, UploadCompressionConfig};
use fedsq::server::{GlobalTensor, RoundDecoder};

#[test]
fn test_round_pipeline_over_many_rounds() {
    // 8 layers of mixed size, 5 rounds chaining the seed
    let sizes = [64usize, 8, 256, 16, 128, 4, 512, 32];
    let samples = 10;
    let config = UploadCompressionConfig::new(CompressType::DiffSparseQuant, 0.1, 8);
    let encoder = RoundEncoder::new(config.clone()).unwrap();
    let decoder = RoundDecoder::new(&config).unwrap();

    let names: Vec<String> = (0..sizes.len()).map(|i| format!("layer{}.weight", i)).collect();
    let mut globals: Vec<Vec<f32>> = sizes
        .iter()
        .enumerate()
        .map(|(k, &n)| (0..n).map(|i| ((i + k) as f32 * 0.01).cos()).collect())
        .collect();

    let mut client_seed = 42;
    let mut server_seed = 42;
    let mut total_raw = 0usize;
    let mut total_compressed = 0usize;

    for round in 0..5 {
        let trained: Vec<Vec<f32>> = globals
            .iter()
            .map(|g| {
                g.iter()
                    .enumerate()
                    .map(|(i, &w)| (w + ((i + round) as f32).sin() * 0.01) * samples as f32)
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
            .encode_round(&updates, samples, client_seed)
            .unwrap();

        // Through the byte form a transport would carry
        let bytes = upload.to_bytes().unwrap();
        let received = RoundUpload::from_bytes(&bytes).unwrap();
        assert_eq!(received, upload);

        let global_views: Vec<_> = names
            .iter()
            .zip(&globals)
            .map(|(n, g)| GlobalTensor::new(n, g))
            .collect();
        let (decoded, next_server) = decoder
            .decode_round(&received, &global_views, samples, server_seed)
            .unwrap();

        assert_eq!(next_client, next_server, "Seed drift in round {}", round);
        client_seed = next_client;
        server_seed = next_server;

        total_raw += sizes.iter().sum::<usize>() * 4;
        total_compressed += upload.encoded_len();

        // Next round starts from the per-sample reconstruction
        globals = decoded
            .into_iter()
            .map(|t| t.weights.into_iter().map(|w| w / samples as f32).collect())
            .collect();
    }

    let ratio = total_raw as f64 / total_compressed as f64;
    println!("Compression ratio over 5 rounds: {:.2}x", ratio);
    assert!(ratio > 20.0, "Expected >20x at 10% retention with 8-bit codes");
}

#[test]
fn test_concrete_scenario() {
    // paramCount 10, ratio 0.5, seed 42: five retained positions
    let (mask, _) = MaskBuilder::new(0.5).unwrap().build(10, 42).unwrap();
    assert_eq!(mask.retain_count(), 5);

    let baseline = vec![0.5f32; 10];
    let trained: Vec<f32> = (0..10).map(|i| i as f32 * 0.25 + 1.0).collect();
    let config = UploadCompressionConfig::new(CompressType::DiffSparseQuant, 0.5, 8);

    let (upload, _) = RoundEncoder::new(config.clone())
        .unwrap()
        .encode_round(&[TensorUpdate::new("w", &trained, &baseline)], 2, 42)
        .unwrap();
    let (decoded, _) = RoundDecoder::new(&config)
        .unwrap()
        .decode_round(&upload, &[GlobalTensor::new("w", &baseline)], 2, 42)
        .unwrap();

    // Retained positions come back exactly, dropped ones collapse to baseline * 2
    let expected: Vec<f32> = (0..10)
        .map(|i| if mask.is_retained(i) { trained[i] } else { 1.0 })
        .collect();
    assert_eq!(decoded[0].weights, expected);
}

#[test]
fn test_shape_mismatch_leaves_seed_usable() {
    let config = UploadCompressionConfig::default();
    let encoder = RoundEncoder::new(config).unwrap();
    let baseline = [0.0f32; 5];
    let short = [1.0f32; 4];

    let err = encoder
        .encode_round(&[TensorUpdate::new("w", &short, &baseline)], 1, 42)
        .unwrap_err();
    assert!(matches!(err, CodecError::ShapeMismatch { trained: 4, baseline: 5, .. }));

    // The seed is still the caller's; a corrected retry matches a fresh build
    let fixed = [1.0f32; 5];
    let (_, next) = encoder
        .encode_round(&[TensorUpdate::new("w", &fixed, &baseline)], 1, 42)
        .unwrap();
    let (_, expected) = MaskBuilder::new(0.4).unwrap().build(5, 42).unwrap();
    assert_eq!(next, expected);
}
