use super::types::{InferenceRequest, Violation, Violations};
use crate::{Error, Result};
use regex::Regex;
use tracing::debug;

pub const ID_PATTERN: &str = r"^[0-9a-zA-Z -]{36}$";
// ` -_` is the range from space to underscore, not three literals.
pub const PROMPT_PATTERN: &str = r"^[A-Za-z0-9 -_.]+$";
pub const BLOB_PATTERN: &str = r"^data:image/(jpeg|png|gif|webp);base64,[A-Za-z0-9+/]+=*$";

pub const PROMPT_MIN_CHARS: usize = 3;
pub const PROMPT_MAX_CHARS: usize = 100;
pub const BLOB_MIN_CHARS: usize = 3;
pub const BLOB_MAX_CHARS: usize = 13_900_000;

struct FieldRule {
    field: &'static str,
    value: fn(&InferenceRequest) -> &str,
    min_chars: Option<usize>,
    max_chars: Option<usize>,
    pattern: Regex,
}

impl FieldRule {
    fn new(
        field: &'static str,
        value: fn(&InferenceRequest) -> &str,
        length: Option<(usize, usize)>,
        pattern: &str,
    ) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            Error::config(format!("Invalid pattern for field '{}': {}", field, e))
        })?;
        Ok(Self {
            field,
            value,
            min_chars: length.map(|(min, _)| min),
            max_chars: length.map(|(_, max)| max),
            pattern,
        })
    }

    fn check(&self, request: &InferenceRequest, violations: &mut Vec<Violation>) {
        let value = (self.value)(request);

        if self.min_chars.is_some() || self.max_chars.is_some() {
            let chars = value.chars().count();
            let too_short = self.min_chars.is_some_and(|min| chars < min);
            let too_long = self.max_chars.is_some_and(|max| chars > max);
            if too_short || too_long {
                violations.push(Violation::new(
                    self.field,
                    format!(
                        "length must be between {} and {} characters, got {}",
                        self.min_chars.unwrap_or(0),
                        self.max_chars.unwrap_or(usize::MAX),
                        chars
                    ),
                ));
                // Skip the pattern scan on values already out of bounds.
                return;
            }
        }

        if !self.pattern.is_match(value) {
            violations.push(Violation::new(
                self.field,
                format!("must match {}", self.pattern.as_str()),
            ));
        }
    }
}

/// Compiled request schema.
///
/// Built once at startup and shared read-only between requests.
pub struct SchemaValidator {
    rules: Vec<FieldRule>,
}

impl SchemaValidator {
    pub fn new() -> Result<Self> {
        let rules = vec![
            FieldRule::new("id", |r| &r.id, None, ID_PATTERN)?,
            FieldRule::new(
                "prompt",
                |r| &r.prompt,
                Some((PROMPT_MIN_CHARS, PROMPT_MAX_CHARS)),
                PROMPT_PATTERN,
            )?,
            FieldRule::new(
                "blob",
                |r| &r.blob,
                Some((BLOB_MIN_CHARS, BLOB_MAX_CHARS)),
                BLOB_PATTERN,
            )?,
        ];

        debug!("Compiled request schema with {} field rules", rules.len());

        Ok(Self { rules })
    }

    /// Checks every field rule in order and reports all violations.
    pub fn validate(&self, request: &InferenceRequest) -> std::result::Result<(), Violations> {
        let mut violations = Vec::new();
        for rule in &self.rules {
            rule.check(request, &mut violations);
        }

        match Violations::from_vec(violations) {
            Some(violations) => Err(violations),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const VALID_ID: &str = "3f1c2a4e-9b7d-4c1e-8a2f-6d5e4c3b2a10";

    fn request(id: &str, prompt: &str, blob: &str) -> InferenceRequest {
        InferenceRequest {
            id: id.to_string(),
            prompt: prompt.to_string(),
            stream: false,
            blob: blob.to_string(),
        }
    }

    fn validator() -> SchemaValidator {
        SchemaValidator::new().unwrap()
    }

    #[test]
    fn test_valid_request_passes() {
        let req = request(
            VALID_ID,
            "Describe the scenery.",
            "data:image/webp;base64,AAAA",
        );
        assert_eq!(validator().validate(&req), Ok(()));
    }

    #[rstest]
    #[case("data:image/jpeg;base64,/9j/4AAQ")]
    #[case("data:image/png;base64,iVBORw0KGgo=")]
    #[case("data:image/gif;base64,R0lGODlh==")]
    #[case("data:image/webp;base64,UklGR+/")]
    fn test_allowed_mime_types(#[case] blob: &str) {
        let req = request(VALID_ID, "What is this", blob);
        assert!(validator().validate(&req).is_ok());
    }

    #[rstest]
    #[case::not_a_data_uri("not-a-data-uri")]
    #[case::svg("data:image/svg+xml;base64,PHN2Zz4=")]
    #[case::missing_base64_marker("data:image/png,iVBORw0KGgo")]
    #[case::space_after_comma("data:image/png;base64, iVBORw0KGgo")]
    #[case::padding_in_middle("data:image/png;base64,AA==AA")]
    #[case::empty_payload("data:image/png;base64,")]
    fn test_rejected_blobs(#[case] blob: &str) {
        let req = request(VALID_ID, "What is this", blob);
        let violations = validator().validate(&req).unwrap_err();
        assert_eq!(violations.fields(), vec!["blob"]);
    }

    #[rstest]
    #[case::too_short("Hi")]
    #[case::newline("Describe\nthis")]
    #[case::braces("Describe {this}")]
    #[case::non_ascii("Décris la scène")]
    fn test_rejected_prompts(#[case] prompt: &str) {
        let req = request(VALID_ID, prompt, "data:image/png;base64,AAAA");
        let violations = validator().validate(&req).unwrap_err();
        assert_eq!(violations.fields(), vec!["prompt"]);
    }

    #[test]
    fn test_prompt_range_admits_punctuation_between_space_and_underscore() {
        let req = request(
            VALID_ID,
            "What's in it? (colors, shapes) #1: [A]",
            "data:image/png;base64,AAAA",
        );
        assert!(validator().validate(&req).is_ok());
    }

    #[test]
    fn test_prompt_length_bounds() {
        let v = validator();
        let exact_max = "a".repeat(PROMPT_MAX_CHARS);
        let too_long = "a".repeat(PROMPT_MAX_CHARS + 1);

        assert!(v
            .validate(&request(VALID_ID, "abc", "data:image/png;base64,AAAA"))
            .is_ok());
        assert!(v
            .validate(&request(VALID_ID, &exact_max, "data:image/png;base64,AAAA"))
            .is_ok());

        let violations = v
            .validate(&request(VALID_ID, &too_long, "data:image/png;base64,AAAA"))
            .unwrap_err();
        assert_eq!(violations.len(), 1);
        assert!(violations.as_slice()[0].constraint.contains("got 101"));
    }

    #[rstest]
    #[case::short("abc")]
    #[case::thirty_seven("3f1c2a4e-9b7d-4c1e-8a2f-6d5e4c3b2a101")]
    #[case::underscore("3f1c2a4e_9b7d_4c1e_8a2f_6d5e4c3b2a10")]
    fn test_rejected_ids(#[case] id: &str) {
        let req = request(id, "What is this", "data:image/png;base64,AAAA");
        let violations = validator().validate(&req).unwrap_err();
        assert_eq!(violations.fields(), vec!["id"]);
    }

    #[test]
    fn test_oversize_blob_reports_length_only() {
        let mut blob = String::from("data:image/png;base64,");
        blob.push_str(&"A".repeat(BLOB_MAX_CHARS));
        let req = request(VALID_ID, "What is this", &blob);

        let violations = validator().validate(&req).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations.as_slice()[0].field, "blob");
        assert!(violations.as_slice()[0].constraint.starts_with("length"));
    }

    #[test]
    fn test_all_violations_reported_in_field_order() {
        let req = request("x", "{}", "not-a-data-uri");
        let violations = validator().validate(&req).unwrap_err();

        assert_eq!(violations.fields(), vec!["id", "prompt", "blob"]);
        let message = violations.to_string();
        assert!(message.starts_with("id: must match"));
        assert_eq!(message.matches("; ").count(), 2);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let v = validator();
        let bad = request("x", "ok prompt", "data:image/bmp;base64,AAAA");
        let good = request(VALID_ID, "ok prompt", "data:image/gif;base64,AAAA");

        assert_eq!(v.validate(&bad), v.validate(&bad));
        assert_eq!(v.validate(&good), v.validate(&good));
    }

    #[test]
    fn test_empty_violation_list_is_not_constructible() {
        assert!(Violations::from_vec(Vec::new()).is_none());
    }
}
