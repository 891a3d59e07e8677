//! flat key value store for the little bit of state that has to survive a restart

use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex, PoisonError},
};

use toml::{Table, Value};

use crate::error::{Result, TimerError};

/// absolute epoch millis at which the pending timer fires
pub const KEY_TRIGGER_TIME: &str = "trigger_time";
/// set while the presentation service is sounding
pub const KEY_IS_RINGING: &str = "is_ringing";

/// Preference table stored as a single toml file.
///
/// Every write is read-modify-write under one lock and lands on disk through a
/// rename, so a single key update is atomic.
#[derive(Debug, Clone)]
pub struct Prefs {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl Prefs {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Arc::new(Mutex::new(())),
        }
    }

    #[cfg(test)]
    fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read()?.get(key).and_then(Value::as_integer))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self
            .read()?
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or_default())
    }

    pub fn put_i64(&self, key: &str, value: i64) -> Result<()> {
        self.edit(|table| {
            table.insert(key.to_string(), Value::Integer(value));
            true
        })
    }

    pub fn put_bool(&self, key: &str, value: bool) -> Result<()> {
        self.edit(|table| {
            table.insert(key.to_string(), Value::Boolean(value));
            true
        })
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.edit(|table| table.remove(key).is_some())
    }

    /// removes `key` only if it still holds `expected`, returns whether it did
    pub fn remove_if_eq(&self, key: &str, expected: i64) -> Result<bool> {
        let mut removed = false;
        self.edit(|table| {
            removed = table.get(key).and_then(Value::as_integer) == Some(expected);
            if removed {
                table.remove(key);
            }
            removed
        })?;
        Ok(removed)
    }

    fn edit(&self, change: impl FnOnce(&mut Table) -> bool) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut table = self.read()?;
        if change(&mut table) {
            self.write(&table)?;
        }
        Ok(())
    }

    /// a file that doesn't parse reads as empty and gets replaced on the next write
    fn read(&self) -> Result<Table> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(toml::from_str(&contents).unwrap_or_else(|source| {
                log::warn!(
                    "{}, starting from empty preferences",
                    TimerError::Parse {
                        path: self.path.clone(),
                        source,
                    }
                );
                Table::new()
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Table::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, table: &Table) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, toml::to_string(table)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs() -> (tempfile::TempDir, Prefs) {
        let dir = tempfile::tempdir().expect("tempdir");
        let prefs = Prefs::new(dir.path().join("nested").join("prefs.toml"));
        (dir, prefs)
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let (_dir, prefs) = prefs();
        assert_eq!(prefs.get_i64(KEY_TRIGGER_TIME).unwrap(), None);
        assert!(!prefs.get_bool(KEY_IS_RINGING).unwrap());
    }

    #[test]
    fn values_survive_a_new_handle() {
        let (_dir, prefs) = prefs();
        prefs.put_i64(KEY_TRIGGER_TIME, 1_700_000_300_000).unwrap();
        prefs.put_bool(KEY_IS_RINGING, true).unwrap();

        let reopened = Prefs::new(prefs.path().to_path_buf());
        assert_eq!(
            reopened.get_i64(KEY_TRIGGER_TIME).unwrap(),
            Some(1_700_000_300_000)
        );
        assert!(reopened.get_bool(KEY_IS_RINGING).unwrap());
    }

    #[test]
    fn remove_clears_only_that_key() {
        let (_dir, prefs) = prefs();
        prefs.put_i64(KEY_TRIGGER_TIME, 5).unwrap();
        prefs.put_bool(KEY_IS_RINGING, true).unwrap();
        prefs.remove(KEY_TRIGGER_TIME).unwrap();
        assert_eq!(prefs.get_i64(KEY_TRIGGER_TIME).unwrap(), None);
        assert!(prefs.get_bool(KEY_IS_RINGING).unwrap());
        // removing twice is fine
        prefs.remove(KEY_TRIGGER_TIME).unwrap();
    }

    #[test]
    fn remove_if_eq_leaves_newer_values() {
        let (_dir, prefs) = prefs();
        prefs.put_i64(KEY_TRIGGER_TIME, 2_000).unwrap();
        assert!(!prefs.remove_if_eq(KEY_TRIGGER_TIME, 1_000).unwrap());
        assert_eq!(prefs.get_i64(KEY_TRIGGER_TIME).unwrap(), Some(2_000));
        assert!(prefs.remove_if_eq(KEY_TRIGGER_TIME, 2_000).unwrap());
        assert_eq!(prefs.get_i64(KEY_TRIGGER_TIME).unwrap(), None);
    }

    #[test]
    fn garbage_file_reads_as_empty() {
        let (_dir, prefs) = prefs();
        fs::create_dir_all(prefs.path().parent().unwrap()).unwrap();
        fs::write(prefs.path(), "trigger_time = ").unwrap();
        assert_eq!(prefs.get_i64(KEY_TRIGGER_TIME).unwrap(), None);
        assert!(!prefs.get_bool(KEY_IS_RINGING).unwrap());
    }

    #[test]
    fn garbage_file_can_be_cleared_and_rewritten() {
        let (_dir, prefs) = prefs();
        fs::create_dir_all(prefs.path().parent().unwrap()).unwrap();
        fs::write(prefs.path(), "this is = = not toml").unwrap();
        prefs.remove(KEY_TRIGGER_TIME).unwrap();
        prefs.remove(KEY_IS_RINGING).unwrap();

        prefs.put_i64(KEY_TRIGGER_TIME, 7_000).unwrap();
        let contents = fs::read_to_string(prefs.path()).unwrap();
        assert!(toml::from_str::<Table>(&contents).is_ok());
        assert_eq!(prefs.get_i64(KEY_TRIGGER_TIME).unwrap(), Some(7_000));
    }
}
