//! SQLite staging store shared by all pipeline steps.
//!
//! The [`StagingStore`] wraps a libSQL database holding the hand-off tables
//! between steps (`loaded_data` → … → `predictions`). Every write is a full
//! table replacement, so re-running a step is idempotent. The store is a
//! scoped resource handle: each step opens it, does its reads/writes, and
//! drops it before the next step runs; sequencing is external, and there is no
//! internal locking.

use std::path::Path;

use leadscore_shared::{Cell, Frame, LeadScoreError, Result};
use libsql::{Connection, Database, Value, params, params_from_iter};

/// Names of the hand-off tables written by the pipeline.
pub mod tables {
    pub const LOADED_DATA: &str = "loaded_data";
    pub const CITY_TIER_MAPPED: &str = "city_tier_mapped";
    pub const CATEGORICAL_VARIABLES_MAPPED: &str = "categorical_variables_mapped";
    pub const INTERACTIONS_MAPPED: &str = "interactions_mapped";
    pub const MODEL_INPUT: &str = "model_input";
    pub const FEATURES: &str = "features";
    pub const TARGET: &str = "target";
    pub const PREDICTIONS: &str = "predictions";
}

/// Staging store handle wrapping a libSQL database.
pub struct StagingStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl StagingStore {
    /// Open or create the staging database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LeadScoreError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| LeadScoreError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| LeadScoreError::Storage(e.to_string()))?;

        Ok(Self { db, conn })
    }

    /// Whether a table with the given name exists.
    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
            )
            .await
            .map_err(|e| LeadScoreError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Ok(false),
            Err(e) => Err(LeadScoreError::Storage(e.to_string())),
        }
    }

    /// Replace a table with the contents of a frame (drop + create + insert).
    pub async fn replace_table(&self, name: &str, frame: &Frame) -> Result<()> {
        check_identifier(name)?;
        for col in frame.columns() {
            check_identifier(col)?;
        }
        if frame.n_cols() == 0 {
            return Err(LeadScoreError::Storage(format!(
                "refusing to write table '{name}' with no columns"
            )));
        }

        self.conn
            .execute(&format!(r#"DROP TABLE IF EXISTS "{name}""#), params![])
            .await
            .map_err(|e| LeadScoreError::Storage(e.to_string()))?;

        let column_defs: Vec<String> = frame
            .columns()
            .iter()
            .map(|c| format!(r#""{c}""#))
            .collect();
        self.conn
            .execute(
                &format!(r#"CREATE TABLE "{name}" ({})"#, column_defs.join(", ")),
                params![],
            )
            .await
            .map_err(|e| LeadScoreError::Storage(e.to_string()))?;

        let placeholders: Vec<String> =
            (1..=frame.n_cols()).map(|i| format!("?{i}")).collect();
        let insert_sql = format!(
            r#"INSERT INTO "{name}" ({}) VALUES ({})"#,
            column_defs.join(", "),
            placeholders.join(", ")
        );

        for row in frame.rows() {
            let values: Vec<Value> = row.iter().map(cell_to_value).collect();
            self.conn
                .execute(&insert_sql, params_from_iter(values))
                .await
                .map_err(|e| LeadScoreError::Storage(e.to_string()))?;
        }

        tracing::info!(table = name, rows = frame.n_rows(), "replaced staging table");
        Ok(())
    }

    /// Read a whole table back into a frame, preserving column order.
    pub async fn read_table(&self, name: &str) -> Result<Frame> {
        check_identifier(name)?;
        if !self.table_exists(name).await? {
            return Err(LeadScoreError::Storage(format!(
                "table '{name}' does not exist in the staging store"
            )));
        }

        let mut rows = self
            .conn
            .query(&format!(r#"SELECT * FROM "{name}""#), params![])
            .await
            .map_err(|e| LeadScoreError::Storage(e.to_string()))?;

        let n_cols = rows.column_count();
        let columns: Vec<String> = (0..n_cols)
            .map(|i| {
                rows.column_name(i)
                    .map(String::from)
                    .ok_or_else(|| LeadScoreError::Storage(format!("unnamed column {i}")))
            })
            .collect::<Result<_>>()?;

        let mut frame = Frame::new(columns);
        loop {
            match rows.next().await {
                Ok(Some(row)) => {
                    let mut cells = Vec::with_capacity(n_cols as usize);
                    for i in 0..n_cols {
                        let value = row
                            .get_value(i)
                            .map_err(|e| LeadScoreError::Storage(e.to_string()))?;
                        cells.push(value_to_cell(value)?);
                    }
                    frame.push_row(cells)?;
                }
                Ok(None) => break,
                Err(e) => return Err(LeadScoreError::Storage(e.to_string())),
            }
        }
        Ok(frame)
    }

    /// Column names of an existing table.
    pub async fn table_columns(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.read_table(name).await?.columns().to_vec())
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn cell_to_value(cell: &Cell) -> Value {
    match cell {
        Cell::Null => Value::Null,
        Cell::Int(v) => Value::Integer(*v),
        Cell::Float(v) => Value::Real(*v),
        Cell::Text(s) => Value::Text(s.clone()),
    }
}

fn value_to_cell(value: Value) -> Result<Cell> {
    match value {
        Value::Null => Ok(Cell::Null),
        Value::Integer(v) => Ok(Cell::Int(v)),
        Value::Real(v) => Ok(Cell::Float(v)),
        Value::Text(s) => Ok(Cell::Text(s)),
        Value::Blob(_) => Err(LeadScoreError::Storage(
            "unexpected blob value in staging table".into(),
        )),
    }
}

/// Table and column names are interpolated into SQL, so restrict them to a
/// safe identifier alphabet.
fn check_identifier(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if ok {
        Ok(())
    } else {
        Err(LeadScoreError::Storage(format!(
            "invalid identifier: {name:?}"
        )))
    }
}
