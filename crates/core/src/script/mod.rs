mod compiled;
mod lint;
mod raw;

pub use compiled::ScriptCompiled;
pub use lint::{IssueKind, ScriptIssue};
pub use raw::ScriptRaw;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceLimiter;

    #[test]
    fn test_huge_script_rejection() {
        let limits = ResourceLimiter {
            max_script_bytes: 100,
            ..Default::default()
        };

        let huge_text = "a".repeat(200);
        let json = format!(
            r#"{{"events": {{"init": {{"steps": [{{"id": "s0", "type": "text", "text": "{huge_text}"}}]}}}}}}"#
        );

        let result = ScriptRaw::from_json_with_limits(&json, limits);
        match result {
            Err(crate::error::VnError::ResourceLimit(_)) => {}
            _ => panic!("Should have failed with ResourceLimit, got {:?}", result),
        }
    }

    #[test]
    fn test_string_budget_counts_nested_fields() {
        let limits = ResourceLimiter {
            max_script_bytes: 1_000,
            ..Default::default()
        };
        let json = format!(
            r#"{{"events": {{"init": {{"steps": [{{"id": "s0", "text": "hi",
                "options": [{{"id": "c", "text": "{long}"}}]}}]}}}}}}"#,
            long = "b".repeat(400)
        );
        let script = ScriptRaw::from_json_with_limits(&json, limits).expect("fits raw size");
        assert!(script.ensure_string_budget(300).is_err());
        assert!(script.ensure_string_budget(1_000).is_ok());
    }
}
