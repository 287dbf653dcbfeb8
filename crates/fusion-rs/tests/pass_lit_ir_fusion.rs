mod lit_support;

use fusion_rs::optimizer::FusionConfig;
use fusion_rs::passes::IrBasedFusionPass;
use lit_support::{load_cases, run_case_with_passes};

#[test]
fn ir_fusion_cases() {
    let cases = load_cases("ir_fusion.lit");
    assert!(!cases.is_empty());
    let pass = IrBasedFusionPass::new(FusionConfig::enabled());
    for case in cases {
        run_case_with_passes(&[&pass], &case);
    }
}

