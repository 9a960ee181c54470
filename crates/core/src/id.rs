//! Unique identifiers for est entities.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for a Task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(Ulid);

impl TaskId {
    /// Generate a new TaskId
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Whether a user-typed reference names this id.
    ///
    /// A reference matches when it is a prefix or a suffix of the canonical
    /// string form. Matching is case-insensitive because ULIDs are Crockford
    /// base32 and users type them by hand.
    pub fn matches_reference(&self, reference: &str) -> bool {
        let full = self.0.to_string();
        if reference.is_empty() || reference.len() > full.len() || !reference.is_ascii() {
            return false;
        }
        full[..reference.len()].eq_ignore_ascii_case(reference)
            || full[full.len() - reference.len()..].eq_ignore_ascii_case(reference)
    }

    /// The trailing six characters, used in one-line listings.
    pub fn short(&self) -> String {
        // Leading characters encode the creation time and collide across tasks.
        let s = self.0.to_string();
        s[s.len() - 6..].to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for TaskId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
