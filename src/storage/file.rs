use super::{StateStorage, found, listed, saved, validate_snapshot, validate_world_id};
use crate::error::{StorageError, StorageResult};
use crate::snapshot::WorldSnapshot;
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One pretty-printed JSON document per snapshot, named
/// `{world_id}_{YYYY-MM-DD}.json`.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    root: PathBuf,
}

impl JsonFileStorage {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(root: P) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!(root = %root.display(), "opened JSON snapshot storage");
        Ok(Self { root })
    }

    /// Directory holding the snapshot files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, world_id: &str, date: NaiveDate) -> PathBuf {
        self.root
            .join(format!("{world_id}_{}.json", date.format(DATE_FORMAT)))
    }

    fn write(&self, snapshot: &WorldSnapshot) -> StorageResult<()> {
        validate_snapshot(snapshot)?;
        let path = self.path_for(&snapshot.world_id, snapshot.simulation_date);
        let tmp = path.with_extension("json.tmp");

        let written = Self::write_to(&tmp, snapshot)
            .and_then(|()| fs::rename(&tmp, &path).map_err(StorageError::from));
        if written.is_err() && tmp.exists() {
            if let Err(err) = fs::remove_file(&tmp) {
                warn!(path = %tmp.display(), error = %err, "could not remove temp file");
            }
        }
        written?;

        debug!(path = %path.display(), "wrote snapshot");
        Ok(())
    }

    fn write_to(tmp: &Path, snapshot: &WorldSnapshot) -> StorageResult<()> {
        let mut writer = BufWriter::new(File::create(tmp)?);
        serde_json::to_writer_pretty(&mut writer, snapshot)?;
        writer.flush()?;
        Ok(())
    }

    fn read(&self, world_id: &str, date: NaiveDate) -> StorageResult<Option<WorldSnapshot>> {
        validate_world_id(world_id)?;
        let path = self.path_for(world_id, date);
        if !path.exists() {
            return Ok(None);
        }
        let snapshot: WorldSnapshot = serde_json::from_reader(BufReader::new(File::open(&path)?))?;
        if snapshot.world_id != world_id || snapshot.simulation_date != date {
            return Err(StorageError::InvalidData(format!(
                "{} holds snapshot for {} on {}",
                path.display(),
                snapshot.world_id,
                snapshot.simulation_date
            )));
        }
        Ok(Some(snapshot))
    }

    fn dates(&self, world_id: &str) -> StorageResult<Vec<NaiveDate>> {
        validate_world_id(world_id)?;
        let prefix = format!("{world_id}_");
        let mut dates = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(stem) = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".json"))
            else {
                continue;
            };
            // A world id that is a prefix of another ("acme" / "acme_eu") leaves
            // a non-date stem behind, which is skipped here.
            if let Ok(date) = NaiveDate::parse_from_str(stem, DATE_FORMAT) {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }
}

impl StateStorage for JsonFileStorage {
    fn save(&self, snapshot: &WorldSnapshot) -> bool {
        saved(self.write(snapshot), snapshot)
    }

    fn load(&self, world_id: &str, date: NaiveDate) -> Option<WorldSnapshot> {
        found(self.read(world_id, date), world_id, "load")
    }

    fn latest_before(&self, world_id: &str, date: NaiveDate) -> Option<WorldSnapshot> {
        let lookup = self.dates(world_id).and_then(|dates| {
            match dates.into_iter().rev().find(|stored| *stored < date) {
                Some(stored) => self.read(world_id, stored),
                None => Ok(None),
            }
        });
        found(lookup, world_id, "latest_before")
    }

    fn list_dates(&self, world_id: &str) -> Vec<NaiveDate> {
        listed(self.dates(world_id), world_id)
    }
}
