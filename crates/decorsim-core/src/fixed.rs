use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Convert an f64 to Fixed64. Use only for initialization and world input,
/// never for buffer amounts.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Clamp a fixed-point value into `[0, 1]`.
#[inline]
pub fn unit_clamp(v: Fixed64) -> Fixed64 {
    v.clamp(Fixed64::ZERO, Fixed64::ONE)
}

/// Ratio `num / den` as a fixed-point fraction. A zero denominator yields 0.
#[inline]
pub fn ratio(num: u32, den: u32) -> Fixed64 {
    if den == 0 {
        return Fixed64::ZERO;
    }
    Fixed64::from_num(num) / Fixed64::from_num(den)
}

/// Scale an integer amount by a fixed-point factor, truncating toward zero.
/// Negative factors yield 0.
#[inline]
pub fn scale(amount: u32, factor: Fixed64) -> u32 {
    if factor <= Fixed64::ZERO {
        return 0;
    }
    (Fixed64::from_num(amount) * factor).to_num::<i64>().clamp(0, u32::MAX as i64) as u32
}
