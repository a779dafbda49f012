//! Filter helpers for Qdrant delete and scroll requests.

use serde_json::{Value, json};

/// Exact-match filter on the `title` payload key.
///
/// Deliberately not a prefix or substring match: deletion must only touch the
/// named document.
pub fn title_filter(title: &str) -> Value {
    json!({
        "must": [
            {
                "key": "title",
                "match": { "value": title }
            }
        ]
    })
}

/// Filter matching every point in a collection.
pub fn match_all() -> Value {
    json!({ "must": [] })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_filter_is_exact_match() {
        let filter = title_filter("folder");
        assert_eq!(
            filter,
            json!({
                "must": [
                    {
                        "key": "title",
                        "match": { "value": "folder" }
                    }
                ]
            })
        );
    }

    #[test]
    fn match_all_is_empty_must() {
        assert_eq!(match_all(), json!({ "must": [] }));
    }
}
