//! Deterministic chat identity
//!
//! A chat is keyed by its participant *set*: the ids are de-duplicated,
//! sorted and joined with [`CHAT_ID_SEPARATOR`]. Generated ids are
//! hyphen-free UUIDs so the separator never occurs inside a participant id.

use crate::error::{RelayError, Result};
use std::collections::HashSet;

/// Separator between participant ids in a chat key.
pub const CHAT_ID_SEPARATOR: char = '-';

/// De-duplicate participant ids, keeping the first occurrence of each.
pub fn normalize_participants<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(AsRef::as_ref)
        .filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}

/// Compute the identity key for a participant set.
pub fn chat_id<S: AsRef<str>>(ids: &[S]) -> String {
    let mut sorted = normalize_participants(ids);
    sorted.sort();
    let separator = CHAT_ID_SEPARATOR.to_string();
    sorted.join(separator.as_str())
}

/// Check a participant list and return its de-duplicated form.
pub fn validate_participants<S: AsRef<str>>(ids: &[S]) -> Result<Vec<String>> {
    if let Some(bad) = ids
        .iter()
        .map(AsRef::as_ref)
        .find(|id| id.trim().is_empty() || id.contains(CHAT_ID_SEPARATOR))
    {
        return Err(RelayError::InvalidParticipant(bad.to_string()));
    }

    let participants = normalize_participants(ids);
    if participants.len() < 2 {
        return Err(RelayError::TooFewParticipants(participants.len()));
    }
    Ok(participants)
}

/// Recover the participant set from a chat key.
///
/// Only canonical keys decompose: at least two distinct, non-empty, sorted
/// parts. Anything else yields `None`.
pub fn decompose_chat_id(id: &str) -> Option<Vec<String>> {
    let parts: Vec<String> = id.split(CHAT_ID_SEPARATOR).map(str::to_string).collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    let participants = validate_participants(&parts).ok()?;
    if chat_id(&participants) != id {
        return None;
    }
    Some(participants)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_id_is_order_independent() {
        assert_eq!(chat_id(&["u2", "u1"]), "u1-u2");
        assert_eq!(chat_id(&["u1", "u2"]), "u1-u2");
        assert_eq!(chat_id(&["u3", "u1", "u2"]), chat_id(&["u2", "u3", "u1"]));
    }

    #[test]
    fn test_chat_id_ignores_duplicates() {
        assert_eq!(chat_id(&["u1", "u2", "u2"]), "u1-u2");
    }

    #[test]
    fn test_normalize_keeps_first_occurrence_order() {
        assert_eq!(normalize_participants(&["u3", "u1", "u3", "u2"]), vec!["u3", "u1", "u2"]);
    }

    #[test]
    fn test_validate_rejects_small_and_malformed_sets() {
        assert_eq!(validate_participants(&["u1"]), Err(RelayError::TooFewParticipants(1)));
        assert_eq!(validate_participants(&["u1", "u1"]), Err(RelayError::TooFewParticipants(1)));
        assert_eq!(
            validate_participants(&["u1", " "]),
            Err(RelayError::InvalidParticipant(" ".into()))
        );
        assert_eq!(
            validate_participants(&["u1", "a-b"]),
            Err(RelayError::InvalidParticipant("a-b".into()))
        );
        let empty: [&str; 0] = [];
        assert_eq!(validate_participants(&empty), Err(RelayError::TooFewParticipants(0)));
    }

    #[test]
    fn test_decompose_only_accepts_canonical_keys() {
        assert_eq!(decompose_chat_id("u1-u2"), Some(vec!["u1".into(), "u2".into()]));
        assert_eq!(decompose_chat_id("u2-u1"), None);
        assert_eq!(decompose_chat_id("u1"), None);
        assert_eq!(decompose_chat_id("u1--u2"), None);
        assert_eq!(decompose_chat_id("u1-u1"), None);
        assert_eq!(decompose_chat_id(""), None);
    }
}
