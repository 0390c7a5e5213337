// JSON expectations: success predicates over CLI and HTTP output
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::{DomainError, Result};
use crate::domain::{Truthy, Verdict};

/// Check applied to the value found at a JSON pointer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "expected")]
pub enum JsonCheck {
    Exists,
    Truthy,
    /// Length of an array, object or string
    Len(usize),
    Equals(Value),
}

/// A JSON pointer (RFC 6901) plus the check its target must pass
///
/// # Example
/// ```
/// use settle_core::application::{JsonCheck, JsonExpectation};
/// use serde_json::json;
///
/// let brokers = JsonExpectation::new("/native", JsonCheck::Len(3)).unwrap();
/// assert!(brokers.evaluate(&json!({"native": ["a", "b", "c"]})).satisfied);
/// assert!(!brokers.evaluate(&json!({"native": ["a"]})).satisfied);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonExpectation {
    pub pointer: String,
    pub check: JsonCheck,
}

impl JsonExpectation {
    pub fn new(pointer: impl Into<String>, check: JsonCheck) -> Result<Self> {
        let pointer = pointer.into();
        validate_pointer(&pointer)?;
        Ok(Self { pointer, check })
    }

    /// Whole document must be truthy
    pub fn document_truthy() -> Self {
        Self {
            pointer: String::new(),
            check: JsonCheck::Truthy,
        }
    }

    pub fn evaluate(&self, document: &Value) -> Verdict {
        let target = document.pointer(&self.pointer);
        let location = if self.pointer.is_empty() {
            "document"
        } else {
            self.pointer.as_str()
        };

        match (&self.check, target) {
            (_, None) => Verdict::pending(format!("{} is missing", location)),
            (JsonCheck::Exists, Some(_)) => Verdict::satisfied(),
            (JsonCheck::Truthy, Some(v)) => {
                if v.is_truthy() {
                    Verdict::satisfied()
                } else {
                    Verdict::pending(format!("{} is falsy: {}", location, v))
                }
            }
            (JsonCheck::Len(expected), Some(v)) => match json_len(v) {
                Some(actual) if actual == *expected => Verdict::satisfied(),
                Some(actual) => Verdict::pending(format!(
                    "{} has length {}, waiting for {}",
                    location, actual, expected
                )),
                None => Verdict::pending(format!("{} has no length: {}", location, v)),
            },
            (JsonCheck::Equals(expected), Some(v)) => {
                if v == expected {
                    Verdict::satisfied()
                } else {
                    Verdict::pending(format!("{} is {}, waiting for {}", location, v, expected))
                }
            }
        }
    }
}

fn validate_pointer(pointer: &str) -> Result<()> {
    if !pointer.is_empty() && !pointer.starts_with('/') {
        return Err(DomainError::InvalidPointer(format!(
            "{} (must be empty or start with '/')",
            pointer
        )));
    }
    Ok(())
}

fn json_len(value: &Value) -> Option<usize> {
    match value {
        Value::Array(a) => Some(a.len()),
        Value::Object(o) => Some(o.len()),
        Value::String(s) => Some(s.chars().count()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn endpoints() -> Value {
        json!({
            "direct": ["10.0.0.1:9092", "10.0.0.2:9092", "10.0.0.3:9092"],
            "native": ["broker-0:9092", "broker-1:9092"],
            "vip": "broker.kafka.l4lb.thisdcos.directory:9092"
        })
    }

    #[test]
    fn test_len_check_reports_progress() {
        let exp = JsonExpectation::new("/native", JsonCheck::Len(3)).unwrap();
        let verdict = exp.evaluate(&endpoints());
        assert!(!verdict.satisfied);
        assert_eq!(verdict.reason, "/native has length 2, waiting for 3");

        let exp = JsonExpectation::new("/direct", JsonCheck::Len(3)).unwrap();
        assert!(exp.evaluate(&endpoints()).satisfied);
    }

    #[test]
    fn test_missing_pointer() {
        let exp = JsonExpectation::new("/address", JsonCheck::Exists).unwrap();
        assert_eq!(exp.evaluate(&endpoints()).reason, "/address is missing");
    }

    #[test]
    fn test_equals_and_array_index() {
        let exp = JsonExpectation::new("/native/0", JsonCheck::Equals(json!("broker-0:9092"))).unwrap();
        assert!(exp.evaluate(&endpoints()).satisfied);

        let exp = JsonExpectation::new("/phases/0/status", JsonCheck::Equals(json!("COMPLETE"))).unwrap();
        let verdict = exp.evaluate(&json!({"phases": [{"status": "IN_PROGRESS"}]}));
        assert_eq!(
            verdict.reason,
            "/phases/0/status is \"IN_PROGRESS\", waiting for \"COMPLETE\""
        );
    }

    #[test]
    fn test_len_on_scalar_is_pending() {
        let exp = JsonExpectation::new("/count", JsonCheck::Len(1)).unwrap();
        let verdict = exp.evaluate(&json!({"count": 1}));
        assert!(!verdict.satisfied);
        assert!(verdict.reason.contains("has no length"));
    }

    #[test]
    fn test_document_truthy() {
        let exp = JsonExpectation::document_truthy();
        assert!(!exp.evaluate(&json!([])).satisfied);
        assert_eq!(exp.evaluate(&json!({})).reason, "document is falsy: {}");
        assert!(exp.evaluate(&json!(["topic1"])).satisfied);
    }

    #[test]
    fn test_invalid_pointer_rejected() {
        let err = JsonExpectation::new("native", JsonCheck::Exists).unwrap_err();
        assert!(err.to_string().contains("must be empty or start with '/'"));
    }

    #[test]
    fn test_serde_shape() {
        let exp = JsonExpectation::new("/native", JsonCheck::Len(3)).unwrap();
        let encoded = serde_json::to_value(&exp).unwrap();
        assert_eq!(
            encoded,
            json!({"pointer": "/native", "check": {"kind": "len", "expected": 3}})
        );
    }
}
