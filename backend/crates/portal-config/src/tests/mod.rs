
use crate::ConfigStore;

use std::env;
use std::path::PathBuf;

use tempfile::TempDir;

/// RAII guard for environment variables - automatically restores on drop
pub(crate) struct EnvGuard {
    key: &'static str,
    original: Option<String>,
}

impl EnvGuard {
    pub(crate) fn set(key: &'static str, value: &str) -> Self {
        unsafe {
            let original = env::var(key).ok();
            env::set_var(key, value);
            Self { key, original }
        }
    }

    pub(crate) fn remove(key: &'static str) -> Self {
        unsafe {
            let original = env::var(key).ok();
            env::remove_var(key);
            Self { key, original }
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        unsafe {
            match &self.original {
                Some(val) => env::set_var(self.key, val),
                None => env::remove_var(self.key),
            }
        }
    }
}

/// Temp directory plus the config file path inside it.
pub(crate) fn temp_config_path() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(crate::CONFIG_FILENAME);
    (temp, path)
}

/// Write `contents` to a fresh config file and load a store from it.
pub(crate) fn store_from_contents(contents: &str) -> (TempDir, ConfigStore) {
    let (temp, path) = temp_config_path();
    std::fs::write(&path, contents).unwrap();
    (temp, ConfigStore::load(path))
}
