use crate::error::{CfnError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Caller-key → player-id bindings, owned by the hosting chat layer. The
/// engine only consumes this interface; hosts with their own persistence
/// implement it over whatever they already run.
pub trait BindingStore: Send + Sync {
    fn lookup(&self, caller: &str) -> Result<Option<String>>;
    fn upsert(&self, caller: &str, player_id: &str) -> Result<()>;
    fn remove(&self, caller: &str) -> Result<()>;
}

/// JSON-file implementation for hosts without a store of their own. One
/// file, read and rewritten whole per operation; binding counts are tiny.
pub struct LocalBindingStore {
    file_path: PathBuf,
}

impl LocalBindingStore {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| CfnError::Storage("Could not find data directory".to_string()))?
            .join("cfn-scout");
        Self::with_dir(base_dir)
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| CfnError::Storage(format!("Failed to create data directory: {}", e)))?;
        Ok(Self {
            file_path: dir.join("bindings.json"),
        })
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        if !self.file_path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.file_path)
            .map_err(|e| CfnError::Storage(format!("Failed to read bindings file: {}", e)))?;
        serde_json::from_str(&content)
            .map_err(|e| CfnError::Storage(format!("Failed to parse bindings file: {}", e)))
    }

    fn save(&self, bindings: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(bindings)
            .map_err(|e| CfnError::Storage(format!("Failed to serialize bindings: {}", e)))?;
        fs::write(&self.file_path, json)
            .map_err(|e| CfnError::Storage(format!("Failed to write bindings file: {}", e)))
    }
}

impl BindingStore for LocalBindingStore {
    fn lookup(&self, caller: &str) -> Result<Option<String>> {
        Ok(self.load()?.get(caller).cloned())
    }

    fn upsert(&self, caller: &str, player_id: &str) -> Result<()> {
        let mut bindings = self.load()?;
        bindings.insert(caller.to_string(), player_id.to_string());
        self.save(&bindings)
    }

    fn remove(&self, caller: &str) -> Result<()> {
        let mut bindings = self.load()?;
        if bindings.remove(caller).is_some() {
            self.save(&bindings)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBindingStore::with_dir(dir.path()).unwrap();

        assert_eq!(store.lookup("qq:12345").unwrap(), None);

        store.upsert("qq:12345", "3425126856").unwrap();
        assert_eq!(
            store.lookup("qq:12345").unwrap(),
            Some("3425126856".to_string())
        );

        // One binding per caller: a second upsert replaces.
        store.upsert("qq:12345", "1111111111").unwrap();
        assert_eq!(
            store.lookup("qq:12345").unwrap(),
            Some("1111111111".to_string())
        );

        store.remove("qq:12345").unwrap();
        assert_eq!(store.lookup("qq:12345").unwrap(), None);
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBindingStore::with_dir(dir.path()).unwrap();
        assert!(store.remove("nobody").is_ok());
    }
}
