use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::preferences::FoodId;

pub const MAX_VALUE_SIZE: usize = 1024 * 1024;

/// Local storage keys. Each holds a JSON array of integer food ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StorageKey {
    Favorites,
    Restricted,
}

impl StorageKey {
    pub const ALL: [StorageKey; 2] = [StorageKey::Favorites, StorageKey::Restricted];

    pub fn as_str(self) -> &'static str {
        match self {
            StorageKey::Favorites => "food-favorites",
            StorageKey::Restricted => "food-restricted",
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum KvError {
    #[error("value too large: {size} bytes exceeds maximum of {max} bytes")]
    ValueTooLarge { size: usize, max: usize },

    #[error("serialization error for '{key}': {message}")]
    Serialization { key: String, message: String },

    #[error("storage error: {0}")]
    Storage(String),
}

pub fn encode_ids(key: StorageKey, ids: &BTreeSet<FoodId>) -> Result<Vec<u8>, KvError> {
    let data = serde_json::to_vec(ids).map_err(|e| KvError::Serialization {
        key: key.to_string(),
        message: e.to_string(),
    })?;

    if data.len() > MAX_VALUE_SIZE {
        return Err(KvError::ValueTooLarge {
            size: data.len(),
            max: MAX_VALUE_SIZE,
        });
    }

    Ok(data)
}

/// A missing or empty value is an empty set.
pub fn decode_ids(key: StorageKey, data: Option<&[u8]>) -> Result<BTreeSet<FoodId>, KvError> {
    let Some(data) = data else {
        return Ok(BTreeSet::new());
    };

    if data.is_empty() {
        return Ok(BTreeSet::new());
    }

    if data.len() > MAX_VALUE_SIZE {
        return Err(KvError::ValueTooLarge {
            size: data.len(),
            max: MAX_VALUE_SIZE,
        });
    }

    serde_json::from_slice(data).map_err(|e| KvError::Serialization {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match_browser_storage() {
        assert_eq!(StorageKey::Favorites.as_str(), "food-favorites");
        assert_eq!(StorageKey::Restricted.as_str(), "food-restricted");
    }

    #[test]
    fn test_encode_is_plain_json_array() {
        let ids: BTreeSet<FoodId> = [FoodId(12), FoodId(3)].into_iter().collect();
        let data = encode_ids(StorageKey::Favorites, &ids).unwrap();
        assert_eq!(data, b"[3,12]");
    }

    #[test]
    fn test_decode_missing_is_empty() {
        assert!(decode_ids(StorageKey::Favorites, None).unwrap().is_empty());
        assert!(decode_ids(StorageKey::Favorites, Some(b"")).unwrap().is_empty());
    }

    #[test]
    fn test_decode_array() {
        let ids = decode_ids(StorageKey::Restricted, Some(b"[5, 7, 5]")).unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![FoodId(5), FoodId(7)]);
    }

    #[test]
    fn test_decode_corrupt() {
        let result = decode_ids(StorageKey::Restricted, Some(b"{not json"));
        assert!(matches!(result, Err(KvError::Serialization { .. })));
    }

    #[test]
    fn test_decode_too_large() {
        let big = vec![b' '; MAX_VALUE_SIZE + 1];
        assert!(matches!(
            decode_ids(StorageKey::Favorites, Some(&big)),
            Err(KvError::ValueTooLarge { .. })
        ));
    }
}
