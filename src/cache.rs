use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::debug;
use serde_json::Value;

use crate::error::CacheError;

// No eviction; entries live until the directory is removed.
pub struct Cache {
    path: PathBuf,
}

impl Cache {
    pub fn new(path: &Path) -> Result<Cache, CacheError> {
        fs::create_dir_all(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Cache {
            path: path.to_path_buf(),
        })
    }

    pub fn write(&self, key: &str, json: &Value) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        let file = File::create(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, json).map_err(|source| CacheError::Json {
            path: path.clone(),
            source,
        })?;
        writer
            .flush()
            .map_err(|source| CacheError::Io { path, source })
    }

    pub fn read(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        let json: Value =
            serde_json::from_str(&contents).map_err(|source| CacheError::Json { path, source })?;
        debug!("cache read: {:?}", json);
        Ok(Some(json))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                c => c,
            })
            .collect();
        self.path.join(format!("{}.json", file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn miss_then_hit() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(&dir.path().join("geocode")).unwrap();
        let json = serde_json::json!({"address": {"postcode": "62701"}});

        assert!(cache.read("39.783,-89.650").unwrap().is_none());
        cache.write("39.783,-89.650", &json).unwrap();

        assert_eq!(cache.read("39.783,-89.650").unwrap(), Some(json));
    }

    #[test]
    fn separators_in_keys_stay_inside_cache_dir() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(dir.path()).unwrap();

        cache.write("../a/b", &serde_json::json!(1)).unwrap();

        assert!(dir.path().join(".._a_b.json").exists());
        assert_eq!(cache.read("../a/b").unwrap(), Some(serde_json::json!(1)));
    }

    #[cfg(unix)]
    #[test]
    fn failed_flush_is_an_error() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(dir.path()).unwrap();
        std::os::unix::fs::symlink("/dev/full", dir.path().join("k.json")).unwrap();

        let res = cache.write("k", &serde_json::json!({"postcode": "62701"}));

        assert!(matches!(res, Err(CacheError::Io { .. })));
    }

    #[test]
    fn corrupt_entry_is_an_error() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(dir.path()).unwrap();
        fs::write(dir.path().join("bad.json"), "{not json").unwrap();

        assert!(matches!(cache.read("bad"), Err(CacheError::Json { .. })));
    }
}
