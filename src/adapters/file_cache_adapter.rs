//! JSON-file key-value cache adapter.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::domain::error::AuagError;
use crate::ports::cache_port::CachePort;

/// One file per key under a base directory.
pub struct FileCacheAdapter {
    base_dir: PathBuf,
}

impl FileCacheAdapter {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

impl CachePort for FileCacheAdapter {
    fn read(&self, key: &str) -> Result<Option<String>, AuagError> {
        match fs::read_to_string(self.blob_path(key)) {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AuagError::Cache {
                reason: format!("failed to read {}: {}", self.blob_path(key).display(), e),
            }),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), AuagError> {
        fs::create_dir_all(&self.base_dir).map_err(|e| AuagError::Cache {
            reason: format!("failed to create {}: {}", self.base_dir.display(), e),
        })?;
        fs::write(self.blob_path(key), value).map_err(|e| AuagError::Cache {
            reason: format!("failed to write {}: {}", self.blob_path(key).display(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_key_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let adapter = FileCacheAdapter::new(dir.path().to_path_buf());
        assert_eq!(adapter.read("nothing").unwrap(), None);
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let adapter = FileCacheAdapter::new(dir.path().to_path_buf());
        adapter.write("prices", r#"[{"a":1}]"#).unwrap();
        assert_eq!(adapter.read("prices").unwrap().unwrap(), r#"[{"a":1}]"#);
    }

    #[test]
    fn write_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let adapter = FileCacheAdapter::new(nested);
        adapter.write("prices", "[]").unwrap();
        assert_eq!(adapter.read("prices").unwrap().unwrap(), "[]");
    }
}
