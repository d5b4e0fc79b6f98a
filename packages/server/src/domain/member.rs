//! Member identity.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Identity of one connected peer.
///
/// A fresh id is generated for every accepted connection, so a member that
/// has been removed can never be admitted again under the same identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MemberId(Uuid);

impl MemberId {
    /// Generate a new random member id (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_returns_unique_ids() {
        // テスト項目: 生成される MemberId は毎回異なる
        // given (前提条件):

        // when (操作):
        let first = MemberId::generate();
        let second = MemberId::generate();

        // then (期待する結果):
        assert_ne!(first, second);
    }

    #[test]
    fn test_serializes_as_plain_uuid_string() {
        // テスト項目: MemberId は UUID 文字列としてシリアライズされる
        // given (前提条件):
        let id = MemberId::generate();

        // when (操作):
        let json = serde_json::to_string(&id).unwrap();

        // then (期待する結果):
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
        assert_eq!(id.to_string(), id.as_uuid().to_string());
    }
}
