//! Directory-backed cache slots for the pipeline steps.
//!
//! One slot holds one JSON value and is clobbered wholesale on every write.
//! Reads are best-effort: a missing, unreadable, or corrupt file is simply
//! "absent". Writes go through a temp file + rename so a racing reader never
//! observes a half-written slot on the same filesystem. Slots are shared,
//! unlocked state; concurrent refreshes are last-write-wins.

use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub const SNAPSHOT_SLOT: &str = "hn-core-feeds.json";
pub const FIRST_ROUND_SLOT: &str = "hn-first-round.json";
pub const SECOND_ROUND_SLOT: &str = "hn-second-round.json";

/// Storage root for all slots. Constructed explicitly so tests can point it
/// at an isolated tempdir instead of the process-wide temp location.
#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let _ = fs::create_dir_all(&root); // best-effort
        Self { root }
    }

    pub fn from_env() -> Self {
        Self::new(crate::config::cache_dir())
    }

    pub fn slot<T>(&self, name: &str) -> CacheSlot<T> {
        CacheSlot {
            path: self.root.join(name),
            _marker: PhantomData,
        }
    }
}

/// A single named cache location for one pipeline step's latest result.
#[derive(Debug, Clone)]
pub struct CacheSlot<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T> CacheSlot<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Best-effort read: any failure means "absent", never an error.
    pub fn read(&self) -> Option<T> {
        let raw = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Clobber write via temp file + rename.
    pub fn write(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        value: String,
    }

    #[test]
    fn write_then_read_roundtrips() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = CacheDir::new(tmp.path());
        let slot: CacheSlot<Payload> = dir.slot("roundtrip.json");

        slot.write(&Payload { value: "a".into() }).unwrap();
        assert_eq!(slot.read(), Some(Payload { value: "a".into() }));
    }

    #[test]
    fn read_missing_slot_is_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = CacheDir::new(tmp.path());
        let slot: CacheSlot<Payload> = dir.slot("nothing-here.json");
        assert!(slot.read().is_none());
    }

    #[test]
    fn read_corrupt_slot_is_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = CacheDir::new(tmp.path());
        let slot: CacheSlot<Payload> = dir.slot("corrupt.json");
        std::fs::write(slot.path(), "{not json").unwrap();
        assert!(slot.read().is_none());
    }

    #[test]
    fn write_clobbers_previous_value() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = CacheDir::new(tmp.path());
        let slot: CacheSlot<Payload> = dir.slot("clobber.json");

        slot.write(&Payload { value: "old".into() }).unwrap();
        slot.write(&Payload { value: "new".into() }).unwrap();
        assert_eq!(slot.read(), Some(Payload { value: "new".into() }));

        // No stray temp file left behind.
        assert!(!slot.path().with_extension("json.tmp").exists());
    }
}
