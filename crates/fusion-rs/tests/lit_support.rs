use std::fs;
use std::path::PathBuf;

use fusion_rs::graph::parse_graph;
use fusion_rs::optimizer::GraphPass;

pub struct Case {
    pub name: String,
    pub input: String,
    pub expected: String,
}

/// Fixture format:
/// EXPECTED:
/// <text graph>
/// INPUT:
/// <text graph>
/// run_test
/// (repeat)
pub fn load_cases(fixture_rel: &str) -> Vec<Case> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(fixture_rel);
    let contents =
        fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {:?}: {}", path, e));
    let mut cases = Vec::new();
    let mut expected = String::new();
    let mut input = String::new();
    let mut in_expected = false;
    let mut in_input = false;
    let mut counter = 0;
    for line in contents.lines() {
        match line.trim_end() {
            "EXPECTED:" => {
                in_expected = true;
                in_input = false;
                expected.clear();
            }
            "INPUT:" => {
                in_input = true;
                in_expected = false;
                input.clear();
            }
            "run_test" => {
                counter += 1;
                cases.push(Case {
                    name: format!("case_{counter}"),
                    input: input.clone(),
                    expected: expected.clone(),
                });
                in_expected = false;
                in_input = false;
            }
            other => {
                if in_expected {
                    expected.push_str(other);
                    expected.push('\n');
                } else if in_input {
                    input.push_str(other);
                    input.push('\n');
                }
            }
        }
    }
    cases
}

pub fn run_case_with_passes(passes: &[&dyn GraphPass], case: &Case) {
    let mut graph = parse_graph(&case.input)
        .unwrap_or_else(|e| panic!("cannot parse input of {}: {}", case.name, e));

    for pass in passes {
        pass.run(&mut graph)
            .unwrap_or_else(|e| panic!("{} failed on {}: {}", pass.name(), case.name, e));
    }

    graph
        .validate()
        .unwrap_or_else(|e| panic!("graph validation failed for {}: {}", case.name, e));
    let out = graph.to_text();
    assert_eq!(
        out.trim(),
        case.expected.trim(),
        "output mismatch for {}",
        case.name
    );
}
