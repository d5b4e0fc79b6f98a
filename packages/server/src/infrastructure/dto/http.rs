//! HTTP API response DTOs.

use serde::Serialize;

use hiroba_shared::time::timestamp_to_rfc3339;

use crate::relay::{MemberSummary, RegistrySnapshot, RegistryStats};

/// Response of `GET /api/members`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembersDto {
    pub member_count: usize,
    pub members: Vec<MemberDto>,
    pub stats: StatsDto,
}

/// One admitted member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberDto {
    pub id: String,
    /// RFC 3339 (UTC)
    pub admitted_at: String,
}

/// Lifetime counters of the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsDto {
    pub admitted: u64,
    pub removed: u64,
    pub evicted: u64,
    pub broadcasts: u64,
    pub deliveries: u64,
}

// ========================================
// Relay → DTO
// ========================================

impl From<MemberSummary> for MemberDto {
    fn from(member: MemberSummary) -> Self {
        Self {
            id: member.id.to_string(),
            admitted_at: timestamp_to_rfc3339(member.admitted_at),
        }
    }
}

impl From<RegistryStats> for StatsDto {
    fn from(stats: RegistryStats) -> Self {
        Self {
            admitted: stats.admitted,
            removed: stats.removed,
            evicted: stats.evicted,
            broadcasts: stats.broadcasts,
            deliveries: stats.deliveries,
        }
    }
}

impl From<RegistrySnapshot> for MembersDto {
    fn from(snapshot: RegistrySnapshot) -> Self {
        Self {
            member_count: snapshot.member_count(),
            members: snapshot.members.into_iter().map(MemberDto::from).collect(),
            stats: snapshot.stats.into(),
        }
    }
}
