//! Prometheus metrics for the election loops.
//!
//! Metrics are registered in the default registry the first time they are
//! touched; [`render`] encodes everything gathered so far in the text format.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, IntCounter, IntGauge, TextEncoder, register_int_counter, register_int_gauge,
};

lazy_static! {
    /// Prometheus counter for completed elections, initial and re-elections.
    pub static ref ELECTIONS: IntCounter = register_int_counter!(
        "rollcall_elections_total",
        "Total number of completed leader elections"
    )
    .unwrap();

    /// Prometheus counter for re-elections triggered by a stale leader.
    pub static ref REELECTIONS: IntCounter = register_int_counter!(
        "rollcall_reelections_total",
        "Total number of re-elections triggered by a stale leader"
    )
    .unwrap();

    pub static ref HEARTBEATS: IntCounter = register_int_counter!(
        "rollcall_heartbeats_total",
        "Total number of heartbeats written"
    )
    .unwrap();

    pub static ref HEARTBEAT_FAILURES: IntCounter = register_int_counter!(
        "rollcall_heartbeat_failures_total",
        "Total number of heartbeat writes that failed"
    )
    .unwrap();

    /// 1 while this process is the leader.
    pub static ref IS_LEADER: IntGauge = register_int_gauge!(
        "rollcall_is_leader",
        "Whether this process is the elected leader"
    )
    .unwrap();
}

/// Encodes the default registry in the Prometheus text format.
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_registered_metrics() {
        ELECTIONS.inc();
        IS_LEADER.set(0);
        let text = render().unwrap();
        assert!(text.contains("rollcall_elections_total"));
        assert!(text.contains("rollcall_is_leader"));
    }
}
