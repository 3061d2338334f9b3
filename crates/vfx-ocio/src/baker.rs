//! LUT baking for legacy shader descriptors.
//!
//! Legacy mode replaces the analytic curve with a 3D lattice over the unit
//! cube (RGB) plus a 1D ramp for alpha, sampled in the shader with linear
//! interpolation. Lattice values come from the analytic channel programs
//! evaluated in f64 at the grid points `i / (edge - 1)`.

use tracing::debug;

use crate::error::{OcioError, OcioResult};
use crate::program::ShaderProgram;

/// Smallest lattice edge.
pub const MIN_EDGE: usize = 2;
/// Largest lattice edge.
pub const MAX_EDGE: usize = 129;

/// Baked lattice data.
#[derive(Debug, Clone, PartialEq)]
pub struct BakedLattice {
    /// Samples per axis.
    pub edge_size: usize,
    /// `edge³` entries, R varies fastest: `index = b*edge*edge + g*edge + r`.
    /// The fourth component is padding (always 1.0).
    pub lattice: Vec<[f32; 4]>,
    /// `edge` alpha samples.
    pub alpha: Vec<f32>,
}

impl BakedLattice {
    /// Flat index of a lattice entry.
    #[inline]
    pub fn index(&self, r: usize, g: usize, b: usize) -> usize {
        b * self.edge_size * self.edge_size + g * self.edge_size + r
    }

    /// Lattice entry at grid coordinates.
    #[inline]
    pub fn get(&self, r: usize, g: usize, b: usize) -> [f32; 4] {
        self.lattice[self.index(r, g, b)]
    }
}

/// Checks a lattice edge.
pub fn validate_edge(edge_size: usize) -> OcioResult<()> {
    if !(MIN_EDGE..=MAX_EDGE).contains(&edge_size) {
        return Err(OcioError::InvalidLutSize {
            size: edge_size,
            min: MIN_EDGE,
            max: MAX_EDGE,
        });
    }
    Ok(())
}

/// Bakes `program` onto an `edge_size` lattice.
pub fn bake(program: &ShaderProgram, edge_size: usize) -> OcioResult<BakedLattice> {
    validate_edge(edge_size)?;

    let channels = program.channels();
    let scale = 1.0 / (edge_size - 1) as f64;
    // Channels are independent, so each axis only needs one 1D pass.
    let axis: [Vec<f32>; 4] = std::array::from_fn(|c| {
        (0..edge_size)
            .map(|i| channels[c].eval_f64(i as f64 * scale) as f32)
            .collect()
    });

    let mut lattice = Vec::with_capacity(edge_size * edge_size * edge_size);
    for b in 0..edge_size {
        for g in 0..edge_size {
            for r in 0..edge_size {
                lattice.push([axis[0][r], axis[1][g], axis[2][b], 1.0]);
            }
        }
    }

    debug!(edge_size, entries = lattice.len(), "baked lattice");

    let [_, _, _, alpha] = axis;
    Ok(BakedLattice { edge_size, lattice, alpha })
}

/// Worst-case error of linearly interpolating `x^exponent` on an
/// `edge_size` lattice over `[0, 1]`.
///
/// The first cell is solved exactly: with `h = 1 / (edge - 1)` the error
/// `|x^p - x h^(p-1)|` peaks at `x = h p^(1/(1-p))`. The other cells use
/// `h^2 / 8 * max|f''|`, taken at `x = h` for `p < 2` and at `x = 1`
/// otherwise. For `p < 1` the first cell dominates and the bound scales
/// as `h^p`, not `h`.
pub fn power_lattice_error(exponent: f64, edge_size: usize) -> f64 {
    let p = exponent;
    if edge_size < MIN_EDGE || p <= 0.0 || p == 1.0 {
        return 0.0;
    }
    let h = 1.0 / (edge_size - 1) as f64;

    let q = p.powf(1.0 / (1.0 - p));
    let first = h.powf(p) * (q.powf(p) - q).abs();

    let curvature = p * (p - 1.0).abs() * if p < 2.0 { h.powf(p - 2.0) } else { 1.0 };
    let rest = if edge_size > 2 { h * h / 8.0 * curvature } else { 0.0 };

    first.max(rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{ChannelProgram, Expr};

    fn square_program() -> ShaderProgram {
        let sq = || ChannelProgram::new().finish(Expr::Input.pow(Expr::constant(2.0)));
        ShaderProgram::new([sq(), ChannelProgram::new(), sq(), sq()])
    }

    #[test]
    fn test_edge_limits() {
        assert!(bake(&square_program(), 1).is_err());
        assert!(bake(&square_program(), 130).is_err());
        assert!(bake(&square_program(), 2).is_ok());
        assert!(bake(&square_program(), 129).is_ok());
    }

    #[test]
    fn test_layout_r_fastest() {
        let lut = bake(&square_program(), 5).unwrap();
        assert_eq!(lut.lattice.len(), 125);
        assert_eq!(lut.alpha.len(), 5);

        // r = 1, g = 2, b = 4
        let entry = lut.get(1, 2, 4);
        assert_eq!(entry[0], 0.0625);
        assert_eq!(entry[1], 0.5);
        assert_eq!(entry[2], 1.0);
        assert_eq!(lut.index(1, 0, 0), 1);
        assert_eq!(lut.index(0, 1, 0), 5);
        assert_eq!(lut.index(0, 0, 1), 25);
    }

    // Dense scan of the interpolant against the closed form.
    fn scanned_error(p: f64, edge: usize) -> f64 {
        let h = 1.0 / (edge - 1) as f64;
        (0..=200_000)
            .map(|i| {
                let x = i as f64 / 200_000.0;
                let k = ((x / h).floor() as usize).min(edge - 2);
                let (x0, x1) = (k as f64 * h, (k + 1) as f64 * h);
                let t = (x - x0) / h;
                let lerp = x0.powf(p) * (1.0 - t) + x1.powf(p) * t;
                (lerp - x.powf(p)).abs()
            })
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_power_lattice_error_bounds_scan() {
        for p in [1.0 / 2.6, 1.0 / 1.8, 1.0 / 1.1, 1.1, 1.8, 2.6] {
            let bound = power_lattice_error(p, 32);
            let scanned = scanned_error(p, 32);
            assert!(scanned <= bound * (1.0 + 1e-9), "p={p}: {scanned} > {bound}");
            assert!(scanned >= bound * 0.95, "p={p}: bound {bound} too loose for {scanned}");
        }
    }

    #[test]
    fn test_power_lattice_error_values() {
        // x^(1/2.6) near zero dominates a 32-point lattice
        let inv = power_lattice_error(1.0 / 2.6, 32);
        assert!(inv > 0.09 && inv < 0.091, "{inv}");
        assert!(power_lattice_error(2.6, 32) < 1e-3);
        assert_eq!(power_lattice_error(1.0, 32), 0.0);
        assert!(power_lattice_error(1.0 / 2.6, 129) < inv);
    }

    #[test]
    fn test_corners() {
        let lut = bake(&square_program(), 17).unwrap();
        assert_eq!(lut.get(0, 0, 0)[..3], [0.0, 0.0, 0.0]);
        assert_eq!(lut.get(16, 16, 16)[..3], [1.0, 1.0, 1.0]);
        assert_eq!(lut.alpha[0], 0.0);
        assert_eq!(lut.alpha[16], 1.0);
    }
}
