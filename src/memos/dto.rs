use serde::Deserialize;

fn default_category() -> String {
    "general".to_string()
}

/// Request body for creating or updating a memo.
#[derive(Debug, Deserialize)]
pub struct MemoPayload {
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_and_tags_default() {
        let payload: MemoPayload = serde_json::from_str(r#"{"content":"buy milk"}"#).unwrap();
        assert_eq!(payload.category, "general");
        assert!(payload.tags.is_empty());
    }

    #[test]
    fn explicit_fields_are_kept() {
        let payload: MemoPayload = serde_json::from_str(
            r#"{"content":"pack bags","category":"travel","tags":["trip","todo"]}"#,
        )
        .unwrap();
        assert_eq!(payload.category, "travel");
        assert_eq!(payload.tags, vec!["trip", "todo"]);
    }
}
