//! Scene file bootstrap and schema upgrades.
//!
//! # Responsibility
//! - Open scene files (or private in-memory scenes) ready for `SqliteScene`.
//! - Bring older scene files up to the current layout step by step.
//!
//! # Invariants
//! - `PRAGMA user_version` equals the number of applied layout steps.
//! - A file written by a newer build is refused, never downgraded.
//! - Returned connections enforce foreign keys, so removing a node drops its
//!   attributes.

use crate::host::{HostError, HostResult};
use log::{debug, error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Ordered layout steps; step `n` moves a file from version `n` to `n + 1`.
const LAYOUT_STEPS: &[&str] = &[
    include_str!("0001_scene.sql"),
    include_str!("0002_attribute_short_names.sql"),
];

/// Scene layout version written by this build.
pub const SCENE_SCHEMA_VERSION: u32 = LAYOUT_STEPS.len() as u32;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a scene file, creating it when absent, and upgrades its layout.
///
/// # Side effects
/// - Emits `scene_open` events with mode, duration and status.
pub fn open_scene_file(path: impl AsRef<Path>) -> HostResult<Connection> {
    let path = path.as_ref();
    log_open("file", || {
        let mut conn = Connection::open(path)?;
        prepare(&mut conn)?;
        Ok(conn)
    })
}

/// Opens an empty private scene that lives as long as the connection.
pub fn open_scene_in_memory() -> HostResult<Connection> {
    log_open("memory", || {
        let mut conn = Connection::open_in_memory()?;
        prepare(&mut conn)?;
        Ok(conn)
    })
}

/// Reads the layout version recorded in a scene file.
pub fn scene_schema_version(conn: &Connection) -> HostResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Fails unless `conn` is at exactly the layout this build writes.
pub(crate) fn ensure_current_layout(conn: &Connection) -> HostResult<()> {
    let found = scene_schema_version(conn)?;
    if found != SCENE_SCHEMA_VERSION {
        return Err(HostError::SchemaMismatch {
            found,
            expected: SCENE_SCHEMA_VERSION,
        });
    }
    Ok(())
}

fn log_open<F>(mode: &str, open: F) -> HostResult<Connection>
where
    F: FnOnce() -> HostResult<Connection>,
{
    let started_at = Instant::now();
    let result = open();
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => info!(
            "event=scene_open module=host.sqlite status=ok mode={mode} version={SCENE_SCHEMA_VERSION} duration_ms={duration_ms}"
        ),
        Err(err) => error!(
            "event=scene_open module=host.sqlite status=error mode={mode} duration_ms={duration_ms} error={err}"
        ),
    }
    result
}

fn prepare(conn: &mut Connection) -> HostResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    upgrade_layout(conn)
}

fn upgrade_layout(conn: &mut Connection) -> HostResult<()> {
    let found = scene_schema_version(conn)?;
    if found > SCENE_SCHEMA_VERSION {
        return Err(HostError::SchemaMismatch {
            found,
            expected: SCENE_SCHEMA_VERSION,
        });
    }

    let tx = conn.transaction()?;
    for (index, step) in LAYOUT_STEPS.iter().enumerate().skip(found as usize) {
        let version = index as u32 + 1;
        tx.execute_batch(step)?;
        tx.pragma_update(None, "user_version", version)?;
        debug!("event=scene_upgrade module=host.sqlite status=ok from={found} to={version}");
    }
    tx.commit()?;
    Ok(())
}
