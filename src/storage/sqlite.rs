use super::{StateStorage, found, listed, saved, validate_snapshot, validate_world_id};
use crate::error::{StorageError, StorageResult};
use crate::snapshot::WorldSnapshot;
use chrono::NaiveDate;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::info;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Snapshots as JSON text in one `world_snapshots` table.
pub struct SqliteStateStorage {
    connection: Mutex<Connection>,
}

impl SqliteStateStorage {
    /// Open or create the database at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let connection = Connection::open(path.as_ref())?;
        Self::initialize_schema(&connection)?;
        info!(path = %path.as_ref().display(), "opened SQLite snapshot storage");
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// A private database that disappears with the store.
    pub fn in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> StorageResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS world_snapshots (
                world_id TEXT NOT NULL,
                simulation_date TEXT NOT NULL,
                world_type TEXT NOT NULL,
                snapshot_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (world_id, simulation_date)
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn write(&self, snapshot: &WorldSnapshot) -> StorageResult<()> {
        validate_snapshot(snapshot)?;
        let json = serde_json::to_string(snapshot)?;
        let conn = self.connection.lock();
        conn.execute(
            "INSERT INTO world_snapshots (world_id, simulation_date, world_type, snapshot_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (world_id, simulation_date) DO UPDATE SET
                world_type = excluded.world_type,
                snapshot_json = excluded.snapshot_json,
                created_at = excluded.created_at",
            params![
                snapshot.world_id,
                snapshot.simulation_date.format(DATE_FORMAT).to_string(),
                snapshot.world_type.as_str(),
                json,
                snapshot.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn query_one(&self, sql: &str, world_id: &str, date: NaiveDate) -> StorageResult<Option<WorldSnapshot>> {
        validate_world_id(world_id)?;
        let conn = self.connection.lock();
        let json: Option<String> = conn
            .query_row(
                sql,
                params![world_id, date.format(DATE_FORMAT).to_string()],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|json| serde_json::from_str(&json).map_err(StorageError::from))
            .transpose()
    }

    fn dates(&self, world_id: &str) -> StorageResult<Vec<NaiveDate>> {
        validate_world_id(world_id)?;
        let conn = self.connection.lock();
        let mut stmt = conn.prepare(
            "SELECT simulation_date FROM world_snapshots WHERE world_id = ?1 ORDER BY simulation_date ASC",
        )?;
        let rows = stmt.query_map(params![world_id], |row| row.get::<_, String>(0))?;

        let mut dates = Vec::new();
        for raw in rows {
            let raw = raw?;
            let date = NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|err| {
                StorageError::InvalidData(format!("invalid stored date '{raw}': {err}"))
            })?;
            dates.push(date);
        }
        Ok(dates)
    }
}

impl StateStorage for SqliteStateStorage {
    fn save(&self, snapshot: &WorldSnapshot) -> bool {
        saved(self.write(snapshot), snapshot)
    }

    fn load(&self, world_id: &str, date: NaiveDate) -> Option<WorldSnapshot> {
        found(
            self.query_one(
                "SELECT snapshot_json FROM world_snapshots WHERE world_id = ?1 AND simulation_date = ?2",
                world_id,
                date,
            ),
            world_id,
            "load",
        )
    }

    fn latest_before(&self, world_id: &str, date: NaiveDate) -> Option<WorldSnapshot> {
        found(
            self.query_one(
                "SELECT snapshot_json FROM world_snapshots
                 WHERE world_id = ?1 AND simulation_date < ?2
                 ORDER BY simulation_date DESC LIMIT 1",
                world_id,
                date,
            ),
            world_id,
            "latest_before",
        )
    }

    fn list_dates(&self, world_id: &str) -> Vec<NaiveDate> {
        listed(self.dates(world_id), world_id)
    }
}
