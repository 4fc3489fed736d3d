//! core::audit
//!
//! The JSON audit record embedded in commit messages.
//!
//! Every commit created by the store carries a machine-parseable message
//! of the form:
//!
//! ```json
//! {"message":"Updated about page","userId":"editor-42","fileName":"about.md"}
//! ```
//!
//! This doubles as an audit log inside ordinary Git history: `git log`
//! remains readable, and history queries can decode the record back into
//! structured form. `fileName` is present only when exactly one path was
//! staged by the commit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::RelPath;

/// Errors from audit record encoding/decoding.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Commit message is not a JSON audit record.
    #[error("commit message is not an audit record: {0}")]
    NotAuditRecord(String),
}

/// Structured audit record serialized into a commit message.
///
/// Field names use camelCase on the wire to match the records written by
/// the hosted editing service, so history produced by either side decodes
/// identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitAudit {
    /// Human-readable description of the mutation.
    pub message: String,

    /// Identifier of the editor who made the change.
    pub user_id: String,

    /// Final path component of the mutated file.
    ///
    /// Only present when the commit staged exactly one path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl CommitAudit {
    /// Build the audit record for a commit staging `paths`.
    ///
    /// `file_name` is filled in only for single-path commits.
    pub fn for_paths(message: &str, user_id: &str, paths: &[RelPath]) -> Self {
        let file_name = match paths {
            [only] => only.file_name().map(String::from),
            _ => None,
        };

        Self {
            message: message.to_string(),
            user_id: user_id.to_string(),
            file_name,
        }
    }

    /// Serialize into the commit-message string.
    pub fn encode(&self) -> String {
        // Serialization of a struct with string fields cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }

    /// Decode a commit message back into an audit record.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::NotAuditRecord`] for messages written outside
    /// the store (e.g. manual commits).
    pub fn decode(message: &str) -> Result<Self, AuditError> {
        serde_json::from_str(message.trim())
            .map_err(|e| AuditError::NotAuditRecord(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> RelPath {
        RelPath::new(s).unwrap()
    }

    #[test]
    fn single_path_includes_file_name() {
        let audit = CommitAudit::for_paths("Created page", "editor-1", &[path("pages/about.md")]);
        assert_eq!(audit.file_name.as_deref(), Some("about.md"));
    }

    #[test]
    fn two_paths_omit_file_name() {
        let audit = CommitAudit::for_paths(
            "Renamed page",
            "editor-1",
            &[path("pages/old.md"), path("pages/new.md")],
        );
        assert!(audit.file_name.is_none());
    }

    #[test]
    fn encode_uses_camel_case_and_omits_none() {
        let audit = CommitAudit {
            message: "Deleted section".into(),
            user_id: "editor-2".into(),
            file_name: None,
        };
        let encoded = audit.encode();
        assert!(encoded.contains("\"userId\""));
        assert!(!encoded.contains("fileName"));
    }

    #[test]
    fn encode_decode_round_trip() {
        let audit = CommitAudit::for_paths("Updated", "editor-3", &[path("index.md")]);
        let decoded = CommitAudit::decode(&audit.encode()).unwrap();
        assert_eq!(decoded, audit);
    }

    #[test]
    fn decode_rejects_plain_messages() {
        assert!(CommitAudit::decode("Initial commit").is_err());
    }

    #[test]
    fn decode_tolerates_trailing_newline() {
        let audit = CommitAudit::for_paths("Updated", "editor-3", &[path("index.md")]);
        let message = format!("{}\n", audit.encode());
        assert_eq!(CommitAudit::decode(&message).unwrap(), audit);
    }
}
