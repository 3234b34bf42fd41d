//! Queries for the commit_log and delivery_log tables. Both share a shape;
//! `LogTable` picks which one.

use graft_core::errors::StorageError;
use rusqlite::{params, Connection};

use crate::to_storage_err;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTable {
    Commits,
    Deliveries,
}

impl LogTable {
    fn name(self) -> &'static str {
        match self {
            Self::Commits => "commit_log",
            Self::Deliveries => "delivery_log",
        }
    }
}

/// One stored payload row.
#[derive(Debug, Clone)]
pub struct PayloadRow {
    pub seq: i64,
    pub commit_id: String,
    pub part: u32,
    pub payload: String,
}

pub fn insert_payload(
    conn: &Connection,
    table: LogTable,
    branch_id: &str,
    commit_id: &str,
    part: u32,
    payload: &str,
) -> Result<i64, StorageError> {
    let sql = format!(
        "INSERT INTO {} (branch_id, commit_id, part, payload) VALUES (?1, ?2, ?3, ?4)",
        table.name()
    );
    conn.prepare_cached(&sql)
        .and_then(|mut stmt| stmt.execute(params![branch_id, commit_id, part, payload]))
        .map_err(to_storage_err)?;
    Ok(conn.last_insert_rowid())
}

/// Every payload of a branch, in append order.
pub fn query_branch(
    conn: &Connection,
    table: LogTable,
    branch_id: &str,
) -> Result<Vec<PayloadRow>, StorageError> {
    let sql = format!(
        "SELECT seq, commit_id, part, payload FROM {} WHERE branch_id = ?1 ORDER BY seq",
        table.name()
    );
    let mut stmt = conn.prepare_cached(&sql).map_err(to_storage_err)?;

    let rows = stmt
        .query_map(params![branch_id], |row| {
            Ok(PayloadRow {
                seq: row.get(0)?,
                commit_id: row.get(1)?,
                part: row.get(2)?,
                payload: row.get(3)?,
            })
        })
        .map_err(to_storage_err)?;

    rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)
}

pub fn count_branch(conn: &Connection, table: LogTable, branch_id: &str) -> Result<i64, StorageError> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE branch_id = ?1", table.name());
    conn.query_row(&sql, params![branch_id], |row| row.get(0))
        .map_err(to_storage_err)
}
