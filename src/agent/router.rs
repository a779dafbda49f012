//! Rule-based intent routing for conversational turns.

use std::path::PathBuf;

/// Tool invocation derived from a user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ingest the folder at the given path.
    Store(PathBuf),
    /// Answer a question from the knowledge base.
    Query(String),
    /// Delete the named document.
    Delete(String),
    /// List indexed document titles.
    List,
    /// Remove everything from the knowledge base.
    Flush,
}

const STORE_KEYWORDS: &[&str] = &["store", "upload", "ingest", "index", "add"];
const DELETE_KEYWORDS: &[&str] = &["delete", "remove", "forget", "drop"];
const FLUSH_KEYWORDS: &[&str] = &["flush", "clear", "wipe", "empty"];
const FILLER_WORDS: &[&str] = &[
    "the", "a", "an", "book", "document", "doc", "file", "folder", "titled", "called", "named",
    "from", "of", "my", "please", "can", "you",
];

/// Map a user message onto a tool command.
///
/// Intent detection is keyword based and ordered: destructive intents are
/// checked before storage so "remove the folder X" never triggers ingestion.
/// Anything that matches no tool intent becomes a knowledge-base query.
pub fn route(message: &str) -> Command {
    let lowered = message.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();

    if matches_keyword(&words, FLUSH_KEYWORDS)
        && (lowered.contains("everything")
            || lowered.contains("all")
            || lowered.contains("knowledge base")
            || lowered.contains("database"))
    {
        return Command::Flush;
    }

    if matches_keyword(&words, DELETE_KEYWORDS) {
        if let Some(title) = extract_title(message) {
            return Command::Delete(title);
        }
    }

    if lowered.contains("list")
        && (lowered.contains("document") || lowered.contains("book") || lowered.contains("title"))
        || lowered.contains("what documents")
        || lowered.contains("show me the documents")
    {
        return Command::List;
    }

    if matches_keyword(&words, STORE_KEYWORDS) {
        if let Some(path) = extract_path(message) {
            return Command::Store(path);
        }
    }

    Command::Query(message.trim().to_string())
}

fn matches_keyword(words: &[&str], keywords: &[&str]) -> bool {
    words.iter().any(|word| {
        let stripped = word.trim_matches(|c: char| !c.is_alphanumeric());
        keywords.contains(&stripped)
    })
}

/// Pull a filesystem path out of a message.
///
/// Quoted spans win; otherwise the first whitespace token containing a path
/// separator is taken.
fn extract_path(message: &str) -> Option<PathBuf> {
    if let Some(quoted) = extract_quoted(message) {
        return Some(PathBuf::from(quoted));
    }
    message
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| c == ',' || c == '.' || c == '!' || c == '?'))
        .find(|token| token.contains('/') || token.contains('\\'))
        .map(PathBuf::from)
}

/// Pull a document title out of a deletion request.
///
/// Quoted spans win; otherwise the words after the deletion keyword, minus
/// filler words, form the title.
fn extract_title(message: &str) -> Option<String> {
    if let Some(quoted) = extract_quoted(message) {
        return Some(quoted);
    }

    let lowered = message.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    let keyword_position = words.iter().position(|word| {
        let stripped = word.trim_matches(|c: char| !c.is_alphanumeric());
        DELETE_KEYWORDS.contains(&stripped)
    })?;

    let original_words: Vec<&str> = message.split_whitespace().collect();
    let title: Vec<&str> = original_words
        .iter()
        .skip(keyword_position + 1)
        .map(|word| word.trim_matches(|c: char| c == ',' || c == '.' || c == '!' || c == '?'))
        .filter(|word| !FILLER_WORDS.contains(&word.to_lowercase().as_str()))
        .collect();

    if title.is_empty() {
        None
    } else {
        Some(
            title
                .join(" ")
                .trim_matches(|c: char| c == ',' || c == '.' || c == '!' || c == '?')
                .to_string(),
        )
    }
}

fn extract_quoted(message: &str) -> Option<String> {
    for quote in ['"', '\''] {
        let mut parts = message.split(quote);
        parts.next()?;
        if let Some(inner) = parts.next()
            && !inner.trim().is_empty()
        {
            return Some(inner.trim().to_string());
        }
    }
    None
}

/// Whether a follow-up message confirms a pending destructive action.
pub fn is_affirmative(message: &str) -> bool {
    let lowered = message.trim().to_lowercase();
    let stripped = lowered.trim_matches(|c: char| !c.is_alphanumeric());
    matches!(
        stripped,
        "yes" | "y" | "yeah" | "yep" | "confirm" | "confirmed" | "do it" | "proceed" | "sure"
    ) || lowered.starts_with("yes,")
        || lowered.starts_with("yes ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_intent_with_path() {
        assert_eq!(
            route("Please store the documents in ./data/folder"),
            Command::Store(PathBuf::from("./data/folder"))
        );
    }

    #[test]
    fn store_intent_with_quoted_path() {
        assert_eq!(
            route("upload \"/srv/books/history\" for me"),
            Command::Store(PathBuf::from("/srv/books/history"))
        );
    }

    #[test]
    fn store_keyword_without_path_falls_back_to_query() {
        assert!(matches!(
            route("What does the store chapter say about inventory?"),
            Command::Query(_)
        ));
    }

    #[test]
    fn delete_intent_with_quoted_title() {
        assert_eq!(
            route("delete the book 'Moby Dick'"),
            Command::Delete("Moby Dick".to_string())
        );
    }

    #[test]
    fn delete_intent_strips_filler_words() {
        assert_eq!(
            route("Please remove the document Moby Dick."),
            Command::Delete("Moby Dick".to_string())
        );
    }

    #[test]
    fn list_intent() {
        assert_eq!(route("list the documents you have"), Command::List);
        assert_eq!(route("Can you list all book titles?"), Command::List);
    }

    #[test]
    fn flush_intent_needs_scope_words() {
        assert_eq!(route("flush everything from the knowledge base"), Command::Flush);
        assert_eq!(route("wipe all documents"), Command::Flush);
        // "clear" alone without scope is treated as a question
        assert!(matches!(route("clear skies today?"), Command::Query(_)));
    }

    #[test]
    fn plain_question_routes_to_query() {
        assert_eq!(
            route("What is the capital of France?"),
            Command::Query("What is the capital of France?".to_string())
        );
    }

    #[test]
    fn affirmations_are_recognized() {
        assert!(is_affirmative("yes"));
        assert!(is_affirmative("Yes, go ahead"));
        assert!(is_affirmative("confirm"));
        assert!(!is_affirmative("no"));
        assert!(!is_affirmative("what would that do?"));
    }
}
