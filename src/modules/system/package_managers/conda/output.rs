//! Parsing of conda's `--json` standard output
//!
//! Conda writes single-line JSON progress reports (objects carrying `progress`
//! or `maxval`) to stdout ahead of the real result, and the result itself may
//! be pretty-printed across many lines. Some releases (4.3.x) also pad the
//! progress reports with NUL bytes.

use serde_json::{Map, Value};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Decoded result object of one conda invocation
pub type ParsedResult = Map<String, Value>;

const PROGRESS_KEYS: [&str; 2] = ["progress", "maxval"];

/// Isolate the result object from conda's stdout.
///
/// Leading progress reports are skipped one line at a time. The first line
/// that is not a progress report is either the (compact) result itself, or,
/// when it does not decode on its own, the start of a multi-line result that
/// is decoded together with everything after it. Returns `None` when no JSON
/// object can be isolated.
pub fn parse_conda_stdout(stdout: &str) -> Option<ParsedResult> {
    let mut lines: VecDeque<&str> = stdout
        .trim()
        .split('\n')
        .map(|line| line.trim_matches('\0'))
        .collect();

    while let Some(line) = lines.pop_front() {
        match serde_json::from_str::<Value>(line) {
            Ok(value) if is_progress_report(&value) => {
                trace!("Skipping conda progress report: {}", line);
            }
            Ok(value) => return into_result(value),
            Err(_) => {
                lines.push_front(line);
                break;
            }
        }
    }

    let remainder: String = lines.into_iter().collect();
    match serde_json::from_str::<Value>(&remainder) {
        Ok(value) => into_result(value),
        Err(e) => {
            debug!("Conda output is not JSON: {}", e);
            None
        }
    }
}

fn is_progress_report(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|object| PROGRESS_KEYS.iter().any(|key| object.contains_key(*key)))
}

fn into_result(value: Value) -> Option<ParsedResult> {
    match value {
        Value::Object(object) => Some(object),
        other => {
            debug!("Conda output is JSON but not an object: {}", other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const VALID_STDOUT: &str = r#"
        {
          "actions": {},
          "success": true
        }
    "#;

    fn valid_result() -> ParsedResult {
        json!({"actions": {}, "success": true})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn progress_line(step: u64) -> String {
        json!({"maxval": 17685, "finished": false, "fetch": "translationstr", "progress": step})
            .to_string()
    }

    #[test]
    fn test_parses_invalid_stdout() {
        assert_eq!(parse_conda_stdout("fail"), None);
    }

    #[test]
    fn test_parses_empty_stdout() {
        assert_eq!(parse_conda_stdout(""), None);
        assert_eq!(parse_conda_stdout("\n\n  \n"), None);
    }

    #[test]
    fn test_parses_valid_stdout() {
        assert_eq!(parse_conda_stdout(VALID_STDOUT), Some(valid_result()));
    }

    #[test]
    fn test_parses_compact_single_line() {
        let stdout = r#"{"message": "All requested packages already installed.", "success": true}"#;
        let parsed = parse_conda_stdout(stdout).unwrap();
        assert_eq!(
            parsed.get("message").and_then(Value::as_str),
            Some("All requested packages already installed.")
        );
    }

    #[test]
    fn test_parses_valid_stdout_with_progress_reports() {
        let stdout = format!(
            "{}\n\u{0}{}\n\u{0}{}",
            r#"{"maxval": 17685, "finished": false, "fetch": "translationstr", "progress": 0}"#,
            r#"{"maxval": 17685, "finished": true, "fetch": "translationstr", "progress": 17685}"#,
            VALID_STDOUT
        );
        assert_eq!(parse_conda_stdout(&stdout), Some(valid_result()));
    }

    #[test]
    fn test_progress_followed_by_compact_result() {
        let stdout = format!(
            "{}\n{}\n{{\"success\": true, \"actions\": {{}}}}",
            progress_line(0),
            progress_line(10)
        );
        assert_eq!(parse_conda_stdout(&stdout), Some(valid_result()));
    }

    #[test]
    fn test_maxval_alone_marks_progress() {
        let stdout = "{\"maxval\": 3}\n{\"success\": false}";
        let parsed = parse_conda_stdout(stdout).unwrap();
        assert_eq!(parsed.get("success"), Some(&json!(false)));
    }

    #[test]
    fn test_only_progress_reports_is_absent() {
        let stdout = format!("{}\n{}", progress_line(0), progress_line(1));
        assert_eq!(parse_conda_stdout(&stdout), None);
    }

    #[test]
    fn test_noise_before_result_is_absent() {
        let stdout = format!("Fetching package metadata ...\n{}", VALID_STDOUT);
        assert_eq!(parse_conda_stdout(&stdout), None);
    }

    #[test]
    fn test_non_object_json_is_absent() {
        assert_eq!(parse_conda_stdout("[1, 2, 3]"), None);
        assert_eq!(parse_conda_stdout("42"), None);
    }

    proptest! {
        #[test]
        fn prop_result_found_after_any_number_of_progress_reports(
            steps in prop::collection::vec(0u64..100_000, 0..8),
            pretty in any::<bool>(),
        ) {
            let result = json!({"actions": {"LINK": ["numpy-1.0"]}, "success": true});
            let mut stdout: Vec<String> = steps.iter().map(|s| progress_line(*s)).collect();
            stdout.push(if pretty {
                serde_json::to_string_pretty(&result).unwrap()
            } else {
                result.to_string()
            });

            let parsed = parse_conda_stdout(&stdout.join("\n"));
            prop_assert_eq!(parsed, result.as_object().cloned());
        }

        #[test]
        fn prop_plain_text_is_absent(text in "[a-zA-Z .,:!-]{0,64}") {
            prop_assert_eq!(parse_conda_stdout(&text), None);
        }
    }
}
