//! Matrix command: dumps the builtin matrix as YAML.

use crate::MatrixArgs;
use anyhow::{Context, Result};
use vfx_tests::{builtin_matrix, matrix_to_yaml};

pub fn run(args: MatrixArgs) -> Result<()> {
    let yaml = matrix_to_yaml(&builtin_matrix())?;
    match args.output {
        Some(path) => std::fs::write(&path, yaml)
            .with_context(|| format!("Failed to write: {}", path.display())),
        None => {
            print!("{yaml}");
            Ok(())
        }
    }
}
