//! Device-local favorite/restricted markers for the selected-foods list.
//!
//! Kept apart from the server preferences. Read once at startup and written
//! back in full after every toggle.

use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::capabilities::{decode_ids, encode_ids, KvError, StorageKey};
use crate::preferences::FoodId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoritesOverlay {
    favorites: BTreeSet<FoodId>,
    restricted: BTreeSet<FoodId>,
    restored: BTreeSet<StorageKey>,
}

impl FavoritesOverlay {
    /// Applies a stored value. Corrupt data is treated as empty.
    pub fn restore(&mut self, key: StorageKey, data: Option<&[u8]>) {
        let ids = decode_ids(key, data).unwrap_or_else(|e| {
            warn!(%key, error = %e, "discarding unreadable overlay");
            BTreeSet::new()
        });

        debug!(%key, count = ids.len(), "overlay restored");
        *self.set_mut(key) = ids;
        self.restored.insert(key);
    }

    pub fn is_restored(&self) -> bool {
        StorageKey::ALL.iter().all(|k| self.restored.contains(k))
    }

    pub fn is_favorite(&self, food_id: FoodId) -> bool {
        self.favorites.contains(&food_id)
    }

    pub fn is_restricted(&self, food_id: FoodId) -> bool {
        self.restricted.contains(&food_id)
    }

    pub fn toggle_favorite(&mut self, food_id: FoodId) {
        self.toggle(StorageKey::Favorites, food_id);
    }

    pub fn toggle_restricted(&mut self, food_id: FoodId) {
        self.toggle(StorageKey::Restricted, food_id);
    }

    /// Marking a food in one set removes it from the other.
    fn toggle(&mut self, key: StorageKey, food_id: FoodId) {
        let set = self.set_mut(key);
        if set.remove(&food_id) {
            return;
        }
        set.insert(food_id);

        let other = match key {
            StorageKey::Favorites => StorageKey::Restricted,
            StorageKey::Restricted => StorageKey::Favorites,
        };
        self.set_mut(other).remove(&food_id);
    }

    /// Full contents of every key, ready to write.
    pub fn snapshot(&self) -> Result<Vec<(StorageKey, Vec<u8>)>, KvError> {
        StorageKey::ALL
            .iter()
            .map(|key| Ok((*key, encode_ids(*key, self.set(*key))?)))
            .collect()
    }

    fn set(&self, key: StorageKey) -> &BTreeSet<FoodId> {
        match key {
            StorageKey::Favorites => &self.favorites,
            StorageKey::Restricted => &self.restricted,
        }
    }

    fn set_mut(&mut self, key: StorageKey) -> &mut BTreeSet<FoodId> {
        match key {
            StorageKey::Favorites => &mut self.favorites,
            StorageKey::Restricted => &mut self.restricted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_and_query() {
        let mut overlay = FavoritesOverlay::default();
        overlay.restore(StorageKey::Favorites, Some(b"[1,2]"));
        assert!(!overlay.is_restored());
        overlay.restore(StorageKey::Restricted, None);
        assert!(overlay.is_restored());
        assert!(overlay.is_favorite(FoodId(2)));
        assert!(!overlay.is_restricted(FoodId(2)));
    }

    #[test]
    fn test_corrupt_storage_is_empty() {
        let mut overlay = FavoritesOverlay::default();
        overlay.restore(StorageKey::Restricted, Some(b"[1,"));
        assert!(!overlay.is_restricted(FoodId(1)));
        assert!(overlay.restored.contains(&StorageKey::Restricted));
    }

    #[test]
    fn test_marks_are_exclusive() {
        let mut overlay = FavoritesOverlay::default();
        overlay.toggle_favorite(FoodId(5));
        overlay.toggle_restricted(FoodId(5));
        assert!(overlay.is_restricted(FoodId(5)));
        assert!(!overlay.is_favorite(FoodId(5)));

        overlay.toggle_restricted(FoodId(5));
        assert!(!overlay.is_restricted(FoodId(5)));
    }

    #[test]
    fn test_snapshot_writes_both_keys() {
        let mut overlay = FavoritesOverlay::default();
        overlay.toggle_favorite(FoodId(9));
        overlay.toggle_favorite(FoodId(3));

        let writes = overlay.snapshot().unwrap();
        assert_eq!(
            writes,
            vec![
                (StorageKey::Favorites, b"[3,9]".to_vec()),
                (StorageKey::Restricted, b"[]".to_vec()),
            ]
        );
    }
}
