//! Polynomial exp2/log2 power approximation.
//!
//! Same Chebyshev fits as the SSE power path of OCIO-style CPU engines
//! (~15 bits of mantissa). Used to emulate hosts whose `pow` is this
//! approximation rather than IEEE.

// log2() over [1.0, 2.0)
const PNLOG5: f32 = 4.487361286440374006195e-2;
const PNLOG4: f32 = -4.165637071209677112635e-1;
const PNLOG3: f32 = 1.631148826119436277100;
const PNLOG2: f32 = -3.550793018041176193407;
const PNLOG1: f32 = 5.091710879305474367557;
const PNLOG0: f32 = -2.800364054395965731506;

// exp2() over [0.0, 1.0)
const PNEXP4: f32 = 1.353416792833547468620e-2;
const PNEXP3: f32 = 5.201146058412685018921e-2;
const PNEXP2: f32 = 2.414427569091865207710e-1;
const PNEXP1: f32 = 6.930038344665415134202e-1;
const PNEXP0: f32 = 1.000002593370603213644;

const EXP_MASK: i32 = 0x7F800000;
const EXP_BIAS: i32 = 127;
const EXP_SHIFT: i32 = 23;

/// Approximate log2 for finite positive `x`.
#[inline]
pub fn fast_log2(x: f32) -> f32 {
    if x <= 0.0 {
        return f32::NEG_INFINITY;
    }

    let bits = x.to_bits() as i32;

    // mantissa in [1, 2)
    let mantissa = f32::from_bits(((bits & !EXP_MASK) | (EXP_BIAS << EXP_SHIFT)) as u32);
    let log2_mantissa = PNLOG0
        + mantissa * (PNLOG1 + mantissa * (PNLOG2 + mantissa * (PNLOG3 + mantissa * (PNLOG4 + mantissa * PNLOG5))));

    let exponent = ((bits & EXP_MASK) >> EXP_SHIFT) - EXP_BIAS;
    log2_mantissa + exponent as f32
}

/// Approximate exp2.
#[inline]
pub fn fast_exp2(x: f32) -> f32 {
    if x.is_nan() {
        return f32::NAN;
    }
    if x < -126.0 {
        return 0.0;
    }
    if x >= 128.0 {
        return f32::INFINITY;
    }

    let floor_x = x.floor() as i32;
    let fraction = x - floor_x as f32;
    let mexp = PNEXP0 + fraction * (PNEXP1 + fraction * (PNEXP2 + fraction * (PNEXP3 + fraction * PNEXP4)));

    // 2^floor_x from exponent bits
    let zf = f32::from_bits(((floor_x + EXP_BIAS) << EXP_SHIFT) as u32);
    zf * mexp
}

/// `pow(base, exp) = exp2(exp * log2(base))`.
///
/// Non-positive bases give 0. NaN propagates; `+inf` stays `+inf` for
/// positive exponents.
#[inline]
pub fn fast_pow(base: f32, exp: f32) -> f32 {
    if base.is_nan() || exp.is_nan() {
        return f32::NAN;
    }
    if base <= 0.0 {
        return 0.0;
    }
    if base.is_infinite() {
        return if exp > 0.0 { f32::INFINITY } else if exp < 0.0 { 0.0 } else { 1.0 };
    }
    fast_exp2(exp * fast_log2(base))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_pow_basic() {
        let result = fast_pow(2.0, 3.0);
        assert!((result - 8.0).abs() < 0.01, "2^3 = {}", result);

        let result = fast_pow(0.5, 2.6);
        let expected = 0.5_f32.powf(2.6);
        let rel_error = (result - expected).abs() / expected;
        assert!(rel_error < 1e-4, "0.5^2.6: got {}, expected {}", result, expected);
    }

    #[test]
    fn test_fast_pow_gamma_range() {
        let bases = [1e-6, 1e-4, 0.02, 0.18, 0.5, 0.9, 1.0, 1.25];
        let powers = [1.0 / 2.6, 1.0 / 1.8, 1.1, 1.8, 2.1, 2.6];

        for &base in &bases {
            for &power in &powers {
                let result = fast_pow(base, power);
                let expected = base.powf(power);
                let rel_error = (result - expected).abs() / expected;
                assert!(rel_error < 1e-3, "{}^{}: got {}, expected {}", base, power, result, expected);
            }
        }
    }

    #[test]
    fn test_fast_pow_edge_cases() {
        assert_eq!(fast_pow(0.0, 1.0), 0.0);
        assert_eq!(fast_pow(-1.0, 2.0), 0.0);
        assert!(fast_pow(f32::NAN, 2.0).is_nan());
        assert_eq!(fast_pow(f32::INFINITY, 1.0 / 2.6), f32::INFINITY);
        assert_eq!(fast_pow(f32::INFINITY, -1.0), 0.0);
        assert!(fast_exp2(f32::NAN).is_nan());
    }
}
