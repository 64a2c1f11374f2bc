pub mod cell;
pub mod election;
pub mod error;
mod heartbeat;
pub mod member;
pub mod notifier;
pub mod state;
pub mod table;

pub use cell::ElectionCell;
pub use election::{ElectionHandle, ElectionSettings, LeaderElection, MonitorOutcome};
pub use error::{ElectionError, LeadershipResult};
pub use member::Member;
pub use notifier::{ElectedSignal, ElectionResult};
pub use state::NodeRole;
pub use table::{Replication, TableOptions, read_members};
