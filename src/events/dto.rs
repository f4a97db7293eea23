use serde::Deserialize;

use crate::events::repo::{Importance, Recurrence};

/// Request body for creating or replacing an event. Optional attributes
/// take the same defaults the store would apply.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default)]
    pub is_all_day: bool,
    #[serde(default)]
    pub is_no_duration: bool,
    #[serde(default)]
    pub importance: Importance,
    pub location: Option<String>,
    #[serde(default)]
    pub recurrence: Recurrence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_payload_gets_defaults() {
        let payload: EventPayload =
            serde_json::from_str(r#"{"title":"Meeting","date":"2025-01-10"}"#).unwrap();
        assert_eq!(payload.importance, Importance::Medium);
        assert_eq!(payload.recurrence, Recurrence::None);
        assert!(!payload.is_all_day);
        assert!(!payload.is_no_duration);
        assert!(payload.start_time.is_none());
    }

    #[test]
    fn importance_parses_lowercase_values() {
        let payload: EventPayload = serde_json::from_str(
            r#"{"title":"Meeting","date":"2025-01-10","importance":"high"}"#,
        )
        .unwrap();
        assert_eq!(payload.importance, Importance::High);
    }

    #[test]
    fn camel_case_flags_are_honored() {
        let payload: EventPayload = serde_json::from_str(
            r#"{"title":"Trip","date":"2025-02-01","isAllDay":true,"recurrence":"weekly"}"#,
        )
        .unwrap();
        assert!(payload.is_all_day);
        assert_eq!(payload.recurrence, Recurrence::Weekly);
    }
}
