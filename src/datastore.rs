//! Named array store with metadata tags

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use nalgebra::DMatrix;
use serde_json::Value;

use crate::crystal::Orientation;
use crate::error::{MisoriError, MisoriResult};

/// Array held in the store, rows are nodes/elements/grains and columns frames
#[derive(Debug, Clone, PartialEq)]
pub enum StoredArray {
    Scalar(DMatrix<f64>),
    Orientation(DMatrix<Orientation>),
}

impl StoredArray {
    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        match self {
            StoredArray::Scalar(m) => m.shape(),
            StoredArray::Orientation(m) => m.shape(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            StoredArray::Scalar(_) => "f64",
            StoredArray::Orientation(_) => "orientation",
        }
    }
}

/// A stored array and its tags
#[derive(Debug, Clone, PartialEq)]
pub struct DataEntry {
    pub data: StoredArray,
    pub tags: BTreeMap<String, Value>,
}

/// Which side wins on key collisions in [`DataStore::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Keep entries already in this store
    Own,
    /// Overwrite with entries from the other store
    Other,
}

/// Keyed container of simulation arrays
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    entries: HashMap<String, DataEntry>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Add a new entry, failing if the key is taken
    pub fn add<I, K>(&mut self, key: &str, data: StoredArray, tags: I) -> MisoriResult<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        if self.contains(key) {
            return Err(MisoriError::DuplicateKey(key.to_string()));
        }
        self.insert(key, data, tags);
        Ok(())
    }

    /// Add or replace an entry
    pub fn insert<I, K>(&mut self, key: &str, data: StoredArray, tags: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let tags = tags.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.entries.insert(key.to_string(), DataEntry { data, tags });
    }

    pub fn remove(&mut self, key: &str) -> Option<DataEntry> {
        self.entries.remove(key)
    }

    pub fn entry(&self, key: &str) -> MisoriResult<&DataEntry> {
        self.entries
            .get(key)
            .ok_or_else(|| MisoriError::KeyNotFound(key.to_string()))
    }

    pub fn get(&self, key: &str) -> MisoriResult<&StoredArray> {
        Ok(&self.entry(key)?.data)
    }

    /// Scalar array under `key`
    pub fn get_scalar(&self, key: &str) -> MisoriResult<&DMatrix<f64>> {
        match self.get(key)? {
            StoredArray::Scalar(m) => Ok(m),
            StoredArray::Orientation(_) => Err(MisoriError::WrongArrayKind(key.to_string())),
        }
    }

    /// Orientation array under `key`
    pub fn get_orientations(&self, key: &str) -> MisoriResult<&DMatrix<Orientation>> {
        match self.get(key)? {
            StoredArray::Orientation(m) => Ok(m),
            StoredArray::Scalar(_) => Err(MisoriError::WrongArrayKind(key.to_string())),
        }
    }

    /// Metadata tag, `None` if the entry exists but lacks the tag
    pub fn tag(&self, key: &str, tag: &str) -> MisoriResult<Option<&Value>> {
        Ok(self.entry(key)?.tags.get(tag))
    }

    pub fn set_tag(&mut self, key: &str, tag: &str, value: Value) -> MisoriResult<()> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| MisoriError::KeyNotFound(key.to_string()))?;
        entry.tags.insert(tag.to_string(), value);
        Ok(())
    }

    /// Merge another store into this one
    pub fn update(&mut self, other: DataStore, priority: Priority) {
        for (key, entry) in other.entries {
            match priority {
                Priority::Other => {
                    self.entries.insert(key, entry);
                }
                Priority::Own => {
                    self.entries.entry(key).or_insert(entry);
                }
            }
        }
    }
}

impl fmt::Display for DataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataStore")?;
        for key in self.keys() {
            let data = &self.entries[&key].data;
            let (rows, cols) = data.shape();
            write!(f, "\n  {key}: {} [{rows}, {cols}]", data.kind())?;
        }
        Ok(())
    }
}
