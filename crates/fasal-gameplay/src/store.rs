//! Farm persistence.
//!
//! A [`FarmStore`] loads and saves whole [`Farm`] snapshots. The engine saves
//! a farm exactly once per committed command, so a store only has to make a
//! single `save` atomic.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use fasal_common::{OwnerId, SchemaVersion, StoreError, StoreResult};
use tracing::{debug, info, warn};

use crate::farm::Farm;

/// Persistence backend for farm snapshots.
pub trait FarmStore: Send + Sync {
    /// Loads a farm, or `None` if the owner has none.
    fn load(&self, owner: OwnerId) -> StoreResult<Option<Farm>>;

    /// Replaces the stored snapshot of a farm.
    fn save(&self, farm: &Farm) -> StoreResult<()>;

    /// Every owner with a stored farm.
    fn owners(&self) -> StoreResult<Vec<OwnerId>>;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    farms: DashMap<OwnerId, Farm>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored farms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.farms.len()
    }

    /// Whether no farm is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.farms.is_empty()
    }
}

impl FarmStore for MemoryStore {
    fn load(&self, owner: OwnerId) -> StoreResult<Option<Farm>> {
        Ok(self.farms.get(&owner).map(|f| f.value().clone()))
    }

    fn save(&self, farm: &Farm) -> StoreResult<()> {
        self.farms.insert(farm.owner(), farm.clone());
        Ok(())
    }

    fn owners(&self) -> StoreResult<Vec<OwnerId>> {
        let mut owners: Vec<_> = self.farms.iter().map(|f| *f.key()).collect();
        owners.sort_unstable();
        Ok(owners)
    }
}

/// One JSON file per farm in a directory.
///
/// Writes go to `{owner}.json.tmp` and are renamed over the live file, so a
/// crash mid-write never leaves a half-written snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(dir: P) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            info!("Created farm directory: {}", dir.display());
        }
        Ok(Self { dir })
    }

    /// Directory holding the snapshots.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn farm_path(&self, owner: OwnerId) -> PathBuf {
        self.dir.join(format!("{}.json", owner.raw()))
    }

    fn temp_path(&self, owner: OwnerId) -> PathBuf {
        self.dir.join(format!("{}.json.tmp", owner.raw()))
    }
}

impl FarmStore for JsonFileStore {
    fn load(&self, owner: OwnerId) -> StoreResult<Option<Farm>> {
        let path = self.farm_path(owner);
        if !path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(&path)?);
        let farm: Farm =
            serde_json::from_reader(reader).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let current = SchemaVersion::FARM_SNAPSHOT;
        if !current.can_read(&farm.version()) {
            return Err(StoreError::VersionMismatch {
                expected: current.to_string(),
                actual: farm.version().to_string(),
            });
        }
        debug!("Loaded farm {} from {}", owner.raw(), path.display());
        Ok(Some(farm))
    }

    fn save(&self, farm: &Farm) -> StoreResult<()> {
        let temp_path = self.temp_path(farm.owner());
        let final_path = self.farm_path(farm.owner());

        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, farm)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            writer.flush()?;
        }

        fs::rename(&temp_path, &final_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StoreError::Unavailable(format!("rename failed: {e}"))
        })?;

        debug!("Saved farm {}", farm.owner().raw());
        Ok(())
    }

    fn owners(&self) -> StoreResult<Vec<OwnerId>> {
        let mut owners = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match stem.parse::<u64>() {
                Ok(raw) => owners.push(OwnerId::new(raw)),
                Err(_) => warn!("Ignoring unrecognised file in farm directory: {}", path.display()),
            }
        }
        owners.sort_unstable();
        Ok(owners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fasal_common::GridPosition;

    use crate::config::SimConfig;
    use crate::crops::CropType;

    fn sample_farm(owner: u64) -> Farm {
        let config = SimConfig::default();
        let now = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).single().expect("valid date");
        let mut farm = Farm::new(OwnerId::new(owner), &config, now);
        farm.plant(&config, GridPosition::new(0, 1), CropType::Carrot, None, 1.0, now)
            .expect("plant");
        farm.take_events();
        farm
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load(OwnerId::new(1)).expect("load").is_none());
        let farm = sample_farm(1);
        store.save(&farm).expect("save");
        assert_eq!(store.load(OwnerId::new(1)).expect("load"), Some(farm));
        assert_eq!(store.owners().expect("owners"), vec![OwnerId::new(1)]);
    }

    #[test]
    fn test_json_store_saves_atomically() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path().join("farms")).expect("open");
        let farm = sample_farm(42);
        store.save(&farm).expect("save");

        assert!(!store.temp_path(farm.owner()).exists());
        let loaded = store.load(OwnerId::new(42)).expect("load").expect("present");
        assert_eq!(loaded, farm);
    }

    #[test]
    fn test_json_store_lists_owners() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path()).expect("open");
        store.save(&sample_farm(3)).expect("save");
        store.save(&sample_farm(1)).expect("save");
        fs::write(dir.path().join("notes.txt"), "x").expect("write");
        assert_eq!(
            store.owners().expect("owners"),
            vec![OwnerId::new(1), OwnerId::new(3)]
        );
    }

    #[test]
    fn test_json_store_rejects_other_major_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path()).expect("open");
        let farm = sample_farm(5);
        store.save(&farm).expect("save");

        let path = store.farm_path(farm.owner());
        let mut value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("parse");
        value["version"]["major"] = serde_json::json!(9);
        fs::write(&path, value.to_string()).expect("write");

        let result = store.load(farm.owner());
        assert!(matches!(result, Err(StoreError::VersionMismatch { .. })));
    }

    #[test]
    fn test_json_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonFileStore::open(dir.path()).expect("open");
        fs::write(dir.path().join("8.json"), "{ not json").expect("write");
        assert!(matches!(
            store.load(OwnerId::new(8)),
            Err(StoreError::Serialization(_))
        ));
    }
}
