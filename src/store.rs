use crate::{
    error::StoreError,
    overrides::{OverrideSet, OVERRIDES_SCHEMA_VERSION},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Load/save round trip for the user's overrides.
pub trait OverrideStore {
    fn load(&mut self) -> Result<OverrideSet, StoreError>;
    fn save(&mut self, overrides: &OverrideSet) -> Result<(), StoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct OverrideFile {
    #[serde(default)]
    saved_at: Option<String>,
    #[serde(flatten)]
    overrides: OverrideSet,
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Timestamp recorded by the last save, if the file has one.
    pub fn saved_at(&self) -> Result<Option<OffsetDateTime>, StoreError> {
        let Some(file) = self.read_file()? else {
            return Ok(None);
        };
        Ok(file
            .saved_at
            .and_then(|stamp| OffsetDateTime::parse(&stamp, &Rfc3339).ok()))
    }

    fn read_file(&self) -> Result<Option<OverrideFile>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        let file: OverrideFile = serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(file))
    }

    fn write_atomic(&self, contents: &str) -> Result<(), StoreError> {
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "overrides.json".into());
        let mut temp_name = file_name.clone();
        temp_name.push(".tmp");
        let mut temp_path = self.path.with_file_name(&temp_name);
        if temp_path.exists() {
            let stamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos();
            let mut temp_name = file_name;
            temp_name.push(format!(".{stamp}.tmp"));
            temp_path = self.path.with_file_name(temp_name);
        }
        fs::write(&temp_path, contents).map_err(write_err)?;
        fs::rename(&temp_path, &self.path).map_err(write_err)?;
        Ok(())
    }
}

impl OverrideStore for JsonFileStore {
    fn load(&mut self) -> Result<OverrideSet, StoreError> {
        let Some(file) = self.read_file()? else {
            return Ok(OverrideSet::default());
        };
        let mut overrides = file.overrides;
        if overrides.schema_version > OVERRIDES_SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                found: overrides.schema_version,
                supported: OVERRIDES_SCHEMA_VERSION,
            });
        }
        overrides.schema_version = OVERRIDES_SCHEMA_VERSION;
        overrides.normalize();
        Ok(overrides)
    }

    fn save(&mut self, overrides: &OverrideSet) -> Result<(), StoreError> {
        let file = OverrideFile {
            saved_at: OffsetDateTime::now_utc().format(&Rfc3339).ok(),
            overrides: overrides.clone(),
        };
        let raw = serde_json::to_string_pretty(&file)?;
        self.write_atomic(&raw)
    }
}

/// Keeps the last saved set in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    saved: OverrideSet,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(overrides: OverrideSet) -> Self {
        Self {
            saved: overrides,
            saves: 0,
        }
    }

    pub fn saved(&self) -> &OverrideSet {
        &self.saved
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl OverrideStore for MemoryStore {
    fn load(&mut self) -> Result<OverrideSet, StoreError> {
        let mut overrides = self.saved.clone();
        overrides.normalize();
        Ok(overrides)
    }

    fn save(&mut self, overrides: &OverrideSet) -> Result<(), StoreError> {
        self.saved = overrides.clone();
        self.saves += 1;
        Ok(())
    }
}

impl<T: OverrideStore + ?Sized> OverrideStore for Box<T> {
    fn load(&mut self) -> Result<OverrideSet, StoreError> {
        (**self).load()
    }

    fn save(&mut self, overrides: &OverrideSet) -> Result<(), StoreError> {
        (**self).save(overrides)
    }
}
