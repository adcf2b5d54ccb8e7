use crate::job::model::{ExecutedSuite, JobDefinition, ResultsLayout};
use regex::Regex;
use serde_yaml::Value;
use std::sync::OnceLock;

const TRADEFED_DEFINITION_SUFFIX: &str = "tradefed.yaml";
const AGGREGATED_FORMAT: &str = "aggregated";

fn abi_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?:^|\s)(?:-a|--abi)\s+(\S+)").ok())
        .as_ref()
}

/// Tradefed suites a job executed, in definition order.
///
/// Test definitions are numbered from 0 across every `test` action, which is
/// how the results service names suites.
pub fn parse_definition(definition: &str) -> Result<JobDefinition, serde_yaml::Error> {
    let document: Value = serde_yaml::from_str(definition)?;
    let mut suites = Vec::new();
    let mut layout = ResultsLayout::PerSuite;
    let mut index = 0usize;

    let actions = document
        .get("actions")
        .and_then(Value::as_sequence)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for action in actions {
        let definitions = action
            .get("test")
            .and_then(|test| test.get("definitions"))
            .and_then(Value::as_sequence)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for test_definition in definitions {
            let position = index;
            index += 1;
            let is_tradefed = test_definition
                .get("path")
                .and_then(Value::as_str)
                .is_some_and(|path| path.ends_with(TRADEFED_DEFINITION_SUFFIX));
            if !is_tradefed {
                continue;
            }
            let name = test_definition
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let params = test_definition.get("params");
            let test_params = params
                .and_then(|params| params.get("TEST_PARAMS"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            let results_format = params
                .and_then(|params| params.get("RESULTS_FORMAT"))
                .and_then(Value::as_str);
            if results_format == Some(AGGREGATED_FORMAT) {
                layout = ResultsLayout::Combined;
            }
            suites.push(ExecutedSuite {
                name: format!("{}_{}", position, name),
                plan: test_params.split_whitespace().next().map(str::to_string),
                abi: abi_pattern()
                    .and_then(|pattern| pattern.captures(test_params))
                    .map(|captures| captures[1].to_string()),
            });
        }
    }

    Ok(JobDefinition { suites, layout })
}
