//! Every shader the builtin matrix generates is valid WGSL.

use naga::valid::{Capabilities, ValidationFlags, Validator};
use vfx_ocio::{Config, GpuProcessor, GpuShaderDesc};
use vfx_ops::{ExponentOp, NegativeStyle, TransformDirection};
use vfx_tests::builtin_matrix;

fn validate_wgsl(label: &str, source: &str) {
    let module = naga::front::wgsl::parse_str(source).unwrap_or_else(|err| panic!("{label}: {err:?}"));
    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    validator
        .validate(&module)
        .unwrap_or_else(|err| panic!("{label}: {err:?}"));
}

#[test]
fn builtin_matrix_shaders_validate() {
    for case in builtin_matrix() {
        let op = case.op.build().unwrap();
        let config = Config::with_major_version(case.schema_version).unwrap();
        let shader = GpuProcessor::new(&op, &config)
            .unwrap()
            .generate(&GpuShaderDesc::with_mode(case.shader))
            .unwrap();
        validate_wgsl(&case.name, shader.source());
    }
}

#[test]
fn reflected_and_pass_thru_inverse_validate() {
    let gamma = [2.2, 2.4, 1.0, 0.5];
    for style in [NegativeStyle::Mirror, NegativeStyle::PassThru] {
        let op = ExponentOp::new(gamma, style, TransformDirection::Inverse).unwrap();
        let shader = GpuProcessor::new(&op, &Config::new())
            .unwrap()
            .generate(&GpuShaderDesc::new())
            .unwrap();
        validate_wgsl(&format!("{style:?}"), shader.source());
    }
}
