//! Membership rows and the leader selection rule.
//!
//! The leader is the member that registered first. Registration timestamps
//! are compared first and the member id breaks ties, so every process folding
//! the same snapshot picks the same winner whatever order the rows arrive in.
//!
//! # Example
//! ```
//! use rollcall::leadership::member::{Member, elect};
//!
//! let members = vec![Member::new("p1", 5), Member::new("p2", 3), Member::new("p3", 8)];
//! assert_eq!(elect(None, members).unwrap().id, "p2");
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;

/// A leadership eligible cluster node, as stored in the membership table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    /// Milliseconds since the Unix epoch, set once at registration.
    pub registration: i64,
    /// Milliseconds since the Unix epoch, refreshed on every heartbeat.
    pub heartbeat: i64,
}

impl Member {
    /// A freshly registered member: its heartbeat equals its registration.
    pub fn new(id: &str, registration: i64) -> Self {
        Self {
            id: id.to_string(),
            registration,
            heartbeat: registration,
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: i64) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Time since the last heartbeat. Heartbeats from the future (clock skew)
    /// count as fresh.
    pub fn staleness(&self, now: i64) -> Duration {
        Duration::from_millis(now.saturating_sub(self.heartbeat).max(0) as u64)
    }

    /// True once the member missed more than one full heartbeat tick.
    pub fn is_stale(&self, now: i64, heartbeat_interval: Duration) -> bool {
        self.staleness(now) >= heartbeat_interval.saturating_mul(2)
    }

    /// Election order: earliest registration, then smallest id.
    pub fn seniority(&self, other: &Member) -> Ordering {
        self.registration
            .cmp(&other.registration)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Current wall clock in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Folds `members` into the most senior one.
///
/// `current` seeds the fold; with no seed the first member seen is taken
/// unconditionally and then challenged by every later one.
pub fn elect<I>(current: Option<Member>, members: I) -> Option<Member>
where
    I: IntoIterator<Item = Member>,
{
    members.into_iter().fold(current, |leader, candidate| match leader {
        None => Some(candidate),
        Some(leader) if candidate.seniority(&leader) == Ordering::Less => Some(candidate),
        Some(leader) => Some(leader),
    })
}
