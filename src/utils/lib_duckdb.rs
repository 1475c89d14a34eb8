use std::{fs, path::Path};

use duckdb::{params_from_iter, types::Value, Connection};
use itertools::Itertools;
use log::info;

use crate::{
    config::DbTarget,
    utils::json_normalize::{Cell, ColumnType, Frame},
};

/// Catalog name of an attached PostgreSQL database.
const PG_CATALOG: &str = "dest";

/// Local temporary table rows are inserted into before the copy.
const STAGING_NAME: &str = "elia_staging";
const STAGING: &str = "temp.main.elia_staging";

/// A DuckDB connection that tables are written to.  For a PostgreSQL target the
/// connection is in-memory with the remote database attached.
pub struct Sink {
    conn: Connection,
    catalog: Option<String>,
}

impl Sink {
    pub fn open(target: &DbTarget) -> Result<Sink, duckdb::Error> {
        match target {
            DbTarget::DuckDb { path } => {
                if let Some(dir) = Path::new(path).parent() {
                    let _ = fs::create_dir_all(dir);
                }
                info!("opening DuckDB file {}", path);
                Ok(Sink {
                    conn: Connection::open(path)?,
                    catalog: None,
                })
            }
            DbTarget::Postgres(pg) => {
                info!(
                    "attaching PostgreSQL database {} on {}:{}",
                    pg.dbname, pg.host, pg.port
                );
                let conn = Connection::open_in_memory()?;
                conn.execute_batch(&format!(
                    "INSTALL postgres;
LOAD postgres;
ATTACH '{}' AS {} (TYPE POSTGRES);",
                    pg.dsn().replace('\'', "''"),
                    PG_CATALOG
                ))?;
                Ok(Sink {
                    conn,
                    catalog: Some(PG_CATALOG.to_string()),
                })
            }
        }
    }

    /// Open the target and make a round trip.  An error here means nothing can be loaded.
    pub fn connect(target: &DbTarget) -> Result<Sink, duckdb::Error> {
        let sink = Sink::open(target)?;
        sink.check_connection()?;
        Ok(sink)
    }

    pub fn in_memory() -> Result<Sink, duckdb::Error> {
        Ok(Sink {
            conn: Connection::open_in_memory()?,
            catalog: None,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Trivial round trip.  For an attached database the query runs remotely.
    pub fn check_connection(&self) -> Result<(), duckdb::Error> {
        let sql = match &self.catalog {
            Some(catalog) => format!("SELECT * FROM postgres_query('{}', 'SELECT 1')", catalog),
            None => "SELECT 1".to_string(),
        };
        self.conn.query_row(&sql, [], |row| row.get::<usize, i32>(0))?;
        Ok(())
    }

    fn qualified(&self, table: &str) -> String {
        match &self.catalog {
            Some(catalog) => format!("{}.{}", quote_identifier(catalog), quote_identifier(table)),
            None => quote_identifier(table),
        }
    }

    /// Drop the table and write the frame in its place.  Rows are staged in a local
    /// temporary table first, then copied over with a single `CREATE TABLE … AS`.
    /// A frame without columns only drops the table.  The drop is not undone if the
    /// copy fails.  Return the number of rows.
    pub fn replace_table(&mut self, table: &str, frame: &Frame) -> Result<usize, duckdb::Error> {
        let name = self.qualified(table);
        if frame.columns.is_empty() {
            self.conn
                .execute_batch(&format!("DROP TABLE IF EXISTS {};", name))?;
            return Ok(0);
        }

        let types = frame.column_types();
        let columns = frame
            .columns
            .iter()
            .zip(&types)
            .map(|(c, t)| format!("{} {}", quote_identifier(c), t.sql()))
            .join(", ");

        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {};
CREATE TEMPORARY TABLE {} ({});",
            STAGING, STAGING_NAME, columns
        ))?;

        let placeholders = vec!["?"; frame.columns.len()].join(", ");
        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare(&format!("INSERT INTO {} VALUES ({})", STAGING, placeholders))?;
            for row in &frame.rows {
                stmt.execute(params_from_iter(
                    row.iter().zip(&types).map(|(cell, t)| sql_value(cell, *t)),
                ))?;
            }
        }
        tx.commit()?;

        self.conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {};
CREATE TABLE {} AS SELECT * FROM {};
DROP TABLE {};",
            name, name, STAGING, STAGING
        ))?;
        Ok(frame.rows.len())
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_value(cell: &Cell, column_type: ColumnType) -> Value {
    match (cell, column_type) {
        (Cell::Null, _) => Value::Null,
        (Cell::Bool(b), ColumnType::Boolean) => Value::Boolean(*b),
        (Cell::Int(i), ColumnType::BigInt) => Value::BigInt(*i),
        (Cell::Int(i), ColumnType::Double) => Value::Double(*i as f64),
        (Cell::Float(x), ColumnType::Double) => Value::Double(*x),
        (other, _) => Value::Text(other.to_string()),
    }
}
