use chrono::{TimeZone, Utc};
use clap::ArgMatches;
use rollcall::StorageAdapterFactory;
use rollcall::leadership::member::now_millis;
use rollcall::leadership::read_members;
use rollcall::storage::TableModel;

use super::load_config;
use crate::error::CliResult;

fn format_millis(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => millis.to_string(),
    }
}

/// Prints the membership table, most senior first.
pub async fn handle_members_command(global: &ArgMatches) -> CliResult<()> {
    let config = load_config(global)?;
    let storage = StorageAdapterFactory::create(&config.storage)?;

    if storage.model() == TableModel::Memory {
        println!("Memory storage keeps no shared membership table");
        return Ok(());
    }

    let interval = config.leadership.heartbeat_interval();
    let members = read_members(storage.as_ref()).await?;

    if members.is_empty() {
        println!("No members registered");
        return Ok(());
    }

    let now = now_millis();
    println!(
        "{:<38} {:<24} {:<24} {:>12} {}",
        "ID", "REGISTERED", "LAST HEARTBEAT", "STALENESS", "STATE"
    );
    for (index, member) in members.iter().enumerate() {
        let state = if member.is_stale(now, interval) {
            "stale"
        } else if index == 0 {
            "leader"
        } else {
            "follower"
        };
        println!(
            "{:<38} {:<24} {:<24} {:>11}s {}",
            member.id,
            format_millis(member.registration),
            format_millis(member.heartbeat),
            member.staleness(now).as_secs(),
            state
        );
    }
    Ok(())
}
