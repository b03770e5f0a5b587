use fedsq_core::MaskBuilder;

// Prints a digest peers can compare to confirm they derive the same mask.
fn main() {
    let builder = MaskBuilder::new(0.1).expect("valid ratio");
    let (mask, next_seed) = builder.build(100_000, 42).expect("mask");

    let bytes: Vec<u8> = mask.as_slice().iter().map(|&b| b as u8).collect();
    println!("MASK_RETAINED {}", mask.retain_count());
    println!("MASK_NEXT_SEED {}", next_seed);
    println!("MASK_HASH {}", sha256(&bytes));
}

fn sha256(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    let out = hasher.finalize();
    hex::encode(out)
}
