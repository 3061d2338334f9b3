//! CPU reference evaluation.
//!
//! Applies an [`ExponentOp`] to a pixel domain in double precision and
//! narrows the result back to `f32`. This is the baseline every GPU result
//! is compared against, so it only ever goes through [`ExponentOp::evaluate`].

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::trace;

use crate::ExponentOp;

/// Domains smaller than this are evaluated on the calling thread.
#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 4096;

/// Evaluate one `f32` pixel through the f64 operator.
#[inline]
pub fn evaluate_pixel(op: &ExponentOp, pixel: [f32; 4]) -> [f32; 4] {
    let wide = pixel.map(f64::from);
    op.evaluate(wide).map(|v| v as f32)
}

/// Evaluate a whole domain. Output has the same length and order as `domain`.
pub fn evaluate(domain: &[[f32; 4]], op: &ExponentOp) -> Vec<[f32; 4]> {
    trace!(pixels = domain.len(), kind = op.kind_name(), "cpu reference");

    #[cfg(feature = "parallel")]
    if domain.len() >= PARALLEL_THRESHOLD {
        return domain.par_iter().map(|&p| evaluate_pixel(op, p)).collect();
    }

    domain.iter().map(|&p| evaluate_pixel(op, p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NegativeStyle, TransformDirection};

    fn op() -> ExponentOp {
        ExponentOp::new([2.6, 1.0, 1.8, 1.1], NegativeStyle::Clamp, TransformDirection::Forward)
            .unwrap()
    }

    #[test]
    fn test_empty_domain() {
        assert!(evaluate(&[], &op()).is_empty());
    }

    #[test]
    fn test_single_value() {
        let out = evaluate(&[[0.5; 4]], &op());
        assert_eq!(out[0][0], 0.5f64.powf(2.6) as f32);
        assert_eq!(out[0][1], 0.5);
    }

    #[test]
    fn test_order_preserved_large_domain() {
        let domain: Vec<[f32; 4]> = (0..10_000)
            .map(|i| [i as f32 / 10_000.0; 4])
            .collect();
        let out = evaluate(&domain, &op());
        assert_eq!(out.len(), domain.len());
        for (i, px) in out.iter().enumerate() {
            assert_eq!(*px, evaluate_pixel(&op(), domain[i]));
        }
    }

    #[test]
    fn test_specials_survive_narrowing() {
        let out = evaluate(&[[f32::NAN, f32::INFINITY, -1.0, 0.0]], &op());
        assert!(out[0][0].is_nan());
        assert_eq!(out[0][1], f32::INFINITY);
        assert_eq!(out[0][2], 0.0);
        assert_eq!(out[0][3], 0.0);
    }
}
