//! Healing task definition.

use chrono::{DateTime, Utc};
use heal_runner::ProfileRegistry;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Language used when a request does not name one.
pub const DEFAULT_LANGUAGE: &str = "python";

/// A natural-language request plus its target language.
///
/// Tasks are immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier
    pub id: Uuid,
    /// What the user asked for
    pub request: String,
    /// Target language name, resolved against the profile registry at run time
    pub language: String,
    /// When the task was created
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a task for an explicit language.
    pub fn new(request: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            request: request.into(),
            language: language.into(),
            created_at: Utc::now(),
        }
    }

    /// Create a task, picking the language from words in the request.
    ///
    /// The first word naming a supported language (or one of its aliases)
    /// wins; otherwise the task targets [`DEFAULT_LANGUAGE`].
    pub fn infer(request: impl Into<String>) -> Self {
        let request = request.into();
        let language = detect_language(&request).unwrap_or(DEFAULT_LANGUAGE).to_string();
        Self::new(request, language)
    }

    /// Short filesystem-safe name derived from the request.
    pub fn slug(&self) -> String {
        self.request
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .take(30)
            .collect()
    }
}

/// Find the first supported language mentioned in `text`.
pub fn detect_language(text: &str) -> Option<&'static str> {
    let registry = ProfileRegistry::global();

    text.split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric() && c != '+'))
        .filter(|word| !word.is_empty())
        .find_map(|word| registry.resolve(word).ok())
        .map(|profile| profile.language.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_has_unique_id() {
        let a = Task::new("print hello", "python");
        let b = Task::new("print hello", "python");
        assert_ne!(a.id, b.id);
        assert_eq!(a.language, "python");
    }

    #[test]
    fn test_infer_language_from_request() {
        assert_eq!(Task::infer("write quicksort in Rust").language, "rust");
        assert_eq!(Task::infer("a small C++ program, please").language, "cpp");
        assert_eq!(Task::infer("Fibonacci (in golang)").language, "go");
        assert_eq!(
            Task::infer("create a binary search tree").language,
            DEFAULT_LANGUAGE
        );
    }

    #[test]
    fn test_slug() {
        let task = Task::new("Write quicksort in Rust!", "rust");
        assert_eq!(task.slug(), "write_quicksort_in_rust_");

        let long = Task::new("implement fibonacci with memoization in Python", "python");
        assert_eq!(long.slug(), "implement_fibonacci_with_memoi");
    }
}
