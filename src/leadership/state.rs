//! Module for the node's election role.
//!
//! A node starts unregistered, registers in the membership table, and then
//! settles as either follower or leader. Leader is terminal: a follower can
//! still be promoted when it wins a re-election, but a leader never steps
//! down without a restart.

use serde::Serialize;
use std::fmt;

/// The `NodeRole` enum represents the different states a node can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// The node has not written its membership row yet.
    #[default]
    Unregistered,
    /// The node is registered but no election has completed.
    Registered,
    /// The node is monitoring another member's heartbeat.
    Follower,
    /// The node won an election and runs the singleton work.
    Leader,
}

impl NodeRole {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_become(&self, next: NodeRole) -> bool {
        matches!(
            (self, next),
            (NodeRole::Unregistered, NodeRole::Registered)
                | (NodeRole::Unregistered, NodeRole::Leader)
                | (NodeRole::Registered, NodeRole::Follower)
                | (NodeRole::Registered, NodeRole::Leader)
                | (NodeRole::Follower, NodeRole::Follower)
                | (NodeRole::Follower, NodeRole::Leader)
        )
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Unregistered => write!(f, "Unregistered"),
            NodeRole::Registered => write!(f, "Registered"),
            NodeRole::Follower => write!(f, "Follower"),
            NodeRole::Leader => write!(f, "Leader"),
        }
    }
}
