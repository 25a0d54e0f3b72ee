//! Per-tenant structured-data store

use std::fs;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::Serialize;

use super::registry::TenantKey;
use crate::error::RouterError;

/// Cap on rows handed back to the model
pub const MAX_ROWS: usize = 200;

pub struct TenantDatabase {
    conn: Mutex<Connection>,
    key: TenantKey,
}

/// Result set of a read-only query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    /// More rows matched than were returned
    pub truncated: bool,
}

impl TenantDatabase {
    /// Open (creating if needed) `<dir>/<key>.db`
    pub fn open(dir: &Path, key: &TenantKey) -> Result<Self, RouterError> {
        fs::create_dir_all(dir).map_err(|e| {
            RouterError::Config(format!("cannot create tenant data dir {}: {}", dir.display(), e))
        })?;
        let path = dir.join(format!("{}.db", key));
        let conn = Connection::open(&path).map_err(transient_open_error)?;
        log::info!("[DB] Opened tenant database {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            key: key.clone(),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory(key: &TenantKey) -> Result<Self, RouterError> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            key: key.clone(),
        })
    }

    pub fn key(&self) -> &TenantKey {
        &self.key
    }

    /// One line per table: `name(column TYPE, ...)`
    pub fn schema_description(&self) -> Result<String, RouterError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut lines = Vec::with_capacity(tables.len());
        for table in tables {
            let mut info = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table.replace('"', "\"\"")))?;
            let columns: Vec<String> = info
                .query_map([], |row| {
                    let name: String = row.get(1)?;
                    let ty: String = row.get(2)?;
                    Ok(if ty.is_empty() { name } else { format!("{} {}", name, ty) })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            lines.push(format!("{}({})", table, columns.join(", ")));
        }
        Ok(lines.join("\n"))
    }

    /// Run a statement that must not modify the database
    pub fn run_select(&self, sql: &str) -> Result<QueryRows, RouterError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        if !stmt.readonly() {
            return Err(RouterError::upstream(format!("refusing to run a non read-only statement: {}", sql)));
        }

        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut truncated = false;
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            if rows.len() == MAX_ROWS {
                truncated = true;
                break;
            }
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(to_json(row.get_ref(i)?));
            }
            rows.push(values);
        }

        Ok(QueryRows {
            columns,
            rows,
            truncated,
        })
    }

    #[cfg(test)]
    pub fn seed(&self, sql: &str) -> Result<(), RouterError> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }
}

impl QueryRows {
    /// Compact text rendering for prompts
    pub fn to_prompt_text(&self) -> String {
        let mut out = self.columns.join(" | ");
        for row in &self.rows {
            out.push('\n');
            out.push_str(
                &row.iter()
                    .map(|v| match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" | "),
            );
        }
        if self.truncated {
            out.push_str(&format!("\n(first {} rows shown)", MAX_ROWS));
        }
        out
    }
}

fn to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => i.into(),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned().into(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()).into(),
    }
}

// A locked or busy database file is worth another attempt
fn transient_open_error(e: rusqlite::Error) -> RouterError {
    match e.sqlite_error_code() {
        Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
            RouterError::retryable(format!("tenant database busy: {}", e))
        }
        _ => RouterError::Storage(e),
    }
}
