/// Round to nearest, ties toward positive infinity: `floor(x + 0.5)`.
///
/// The sum is formed in f64 so it is exact for every f32 input; rounding the
/// f32 sum instead would send 0.49999997 to 1. Out-of-range values saturate
/// to `i32::MIN`/`i32::MAX` and NaN maps to 0.
#[inline]
pub fn round_half_up(x: f32) -> i32 {
    (f64::from(x) + 0.5).floor() as i32
}

/// Keep the low 8 bits (two's-complement truncation, no clamping).
#[inline]
pub fn narrow_to_i8(value: i32) -> i8 {
    value as i8
}
