//! CLI command implementations

pub mod matrix;
pub mod parity;
pub mod shader;

use anyhow::{bail, Result};

/// Expands a per-channel list: one value fills RGB, three fill RGB, four
/// set RGBA. Alpha defaults to `alpha`.
pub fn expand_channels(values: &[f64], alpha: f64, what: &str) -> Result<[f64; 4]> {
    match *values {
        [v] => Ok([v, v, v, alpha]),
        [r, g, b] => Ok([r, g, b, alpha]),
        [r, g, b, a] => Ok([r, g, b, a]),
        _ => bail!("{what} takes 1, 3 or 4 values, got {}", values.len()),
    }
}
