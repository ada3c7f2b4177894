//! Sprite store: the ordered set of point entities drawn by the sprite layer.
//!
//! Every mutation raises the dirty flag. The store never schedules rendering
//! itself; the frame gate reads and clears the flag when it rebuilds.

use glam::DVec2;

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteEntity {
    pub id: u32,
    /// Map projection units (Web Mercator meters in the viewer).
    pub position: DVec2,
    pub style_code: String,
}

#[derive(Debug, Default)]
pub struct SpriteStore {
    entities: Vec<SpriteEntity>,
    dirty: bool,
}

impl SpriteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A freshly populated store starts dirty so the first frame builds it.
    pub fn from_entities(entities: Vec<SpriteEntity>) -> Self {
        let dirty = !entities.is_empty();
        Self { entities, dirty }
    }

    pub fn push(&mut self, entity: SpriteEntity) {
        self.entities.push(entity);
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SpriteEntity> {
        self.entities.get(index)
    }

    /// Entities in stable insertion order.
    pub fn entities(&self) -> &[SpriteEntity] {
        &self.entities
    }

    pub fn iter(&self) -> impl Iterator<Item = &SpriteEntity> {
        self.entities.iter()
    }

    pub fn set_position(&mut self, index: usize, position: DVec2) -> bool {
        let Some(entity) = self.entities.get_mut(index) else {
            return false;
        };
        entity.position = position;
        self.dirty = true;
        true
    }

    pub fn translate(&mut self, index: usize, delta: DVec2) -> bool {
        let Some(entity) = self.entities.get_mut(index) else {
            return false;
        };
        entity.position += delta;
        self.dirty = true;
        true
    }

    pub fn set_style(&mut self, index: usize, style_code: impl Into<String>) -> bool {
        let Some(entity) = self.entities.get_mut(index) else {
            return false;
        };
        entity.style_code = style_code.into();
        self.dirty = true;
        true
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: u32, x: f64, y: f64, style: &str) -> SpriteEntity {
        SpriteEntity {
            id,
            position: DVec2::new(x, y),
            style_code: style.to_string(),
        }
    }

    #[test]
    fn new_store_is_clean_and_empty() {
        let store = SpriteStore::new();
        assert!(store.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn populated_store_starts_dirty() {
        let store = SpriteStore::from_entities(vec![entity(0, 1.0, 2.0, "A")]);
        assert_eq!(store.len(), 1);
        assert!(store.is_dirty());
    }

    #[test]
    fn mutations_raise_dirty_flag() {
        let mut store = SpriteStore::from_entities(vec![entity(0, 0.0, 0.0, "A")]);
        store.clear_dirty();

        assert!(store.set_position(0, DVec2::new(5.0, 6.0)));
        assert!(store.is_dirty());
        store.clear_dirty();

        assert!(store.translate(0, DVec2::new(1.0, -1.0)));
        assert_eq!(store.get(0).map(|e| e.position), Some(DVec2::new(6.0, 5.0)));
        assert!(store.is_dirty());
        store.clear_dirty();

        assert!(store.set_style(0, "B"));
        assert_eq!(store.get(0).map(|e| e.style_code.as_str()), Some("B"));
        assert!(store.is_dirty());
    }

    #[test]
    fn out_of_range_mutation_is_rejected_without_dirtying() {
        let mut store = SpriteStore::from_entities(vec![entity(0, 0.0, 0.0, "A")]);
        store.clear_dirty();
        assert!(!store.set_position(3, DVec2::ZERO));
        assert!(!store.translate(3, DVec2::ONE));
        assert!(!store.set_style(3, "B"));
        assert!(!store.is_dirty());
    }

    #[test]
    fn iteration_order_is_insertion_order() {
        let mut store = SpriteStore::new();
        store.push(entity(7, 0.0, 0.0, "A"));
        store.push(entity(3, 0.0, 0.0, "B"));
        store.push(entity(5, 0.0, 0.0, "C"));
        let ids: Vec<u32> = store.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![7, 3, 5]);
    }
}
