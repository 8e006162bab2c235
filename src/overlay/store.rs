use super::types::{Overlay, OverlayId, OverlayKind, OverlayPatch};

/// Ordered overlay collection. Insertion order is z-order: the last overlay
/// is drawn on top and wins hit tests.
///
/// No operation fails; unknown ids are ignored.
#[derive(Debug, Default)]
pub struct OverlayStore {
    overlays: Vec<Overlay>,
    next_id: u64,
}

impl OverlayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an overlay on top of the stack and return its fresh id.
    pub fn add(&mut self, group: impl Into<String>, kind: OverlayKind) -> OverlayId {
        self.next_id += 1;
        let id = OverlayId(self.next_id);
        let overlay = Overlay::new(id, group.into(), kind);
        tracing::debug!(
            "Adding {} {} to group {:?}",
            overlay.kind.type_name(),
            id,
            overlay.group
        );
        self.overlays.push(overlay);
        id
    }

    pub fn get(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.id() == id)
    }

    /// Merge `patch` into the overlay's payload; no-op if `id` is unknown.
    pub fn update(&mut self, id: OverlayId, patch: &OverlayPatch) {
        if let Some(overlay) = self.overlays.iter_mut().find(|o| o.id() == id) {
            overlay.kind.apply(patch);
        }
    }

    pub fn remove_by_id(&mut self, id: OverlayId) {
        self.overlays.retain(|o| o.id() != id);
    }

    /// Remove every overlay tagged `group`.
    pub fn remove_by_group(&mut self, group: &str) {
        let before = self.overlays.len();
        self.overlays.retain(|o| o.group != group);
        let removed = before - self.overlays.len();
        if removed > 0 {
            tracing::debug!("Removed {} overlays from group {:?}", removed, group);
        }
    }

    pub fn clear(&mut self) {
        self.overlays.clear();
    }

    pub fn contains_group(&self, group: &str) -> bool {
        self.overlays.iter().any(|o| o.group == group)
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// Bottom to top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Overlay> {
        self.overlays.iter()
    }

    /// Bottom to top, for per-frame animation updates.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Overlay> {
        self.overlays.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::types::{ScrollingText, StaticText};

    fn text(label: &str) -> OverlayKind {
        OverlayKind::StaticText(StaticText::new(label, 0.0, 0.0, 20.0))
    }

    fn ids(store: &OverlayStore) -> Vec<OverlayId> {
        store.iter().map(|o| o.id()).collect()
    }

    #[test]
    fn add_then_remove_restores_previous_state() {
        let mut store = OverlayStore::new();
        store.add("custom", text("a"));
        store.add("privacy", text("b"));
        let before = ids(&store);

        let id = store.add("custom", text("c"));
        store.remove_by_id(id);

        assert_eq!(ids(&store), before);
    }

    #[test]
    fn ids_are_unique_and_ordered() {
        let mut store = OverlayStore::new();
        let a = store.add("g", text("a"));
        store.remove_by_id(a);
        let b = store.add("g", text("b"));
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn remove_by_group_removes_all_members() {
        let mut store = OverlayStore::new();
        store.add("logo", text("1"));
        let keep = store.add("custom", text("2"));
        store.add("logo", text("3"));

        store.remove_by_group("logo");

        assert!(!store.contains_group("logo"));
        assert_eq!(ids(&store), vec![keep]);

        // empty group is fine
        store.remove_by_group("logo");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_merges_and_ignores_unknown_ids() {
        let mut store = OverlayStore::new();
        let id = store.add(
            "custom",
            OverlayKind::ScrollingText(ScrollingText::new("hello", 50.0, 48.0)),
        );

        store.update(id, &OverlayPatch::position(5.0, 60.0));
        store.update(OverlayId(999), &OverlayPatch::position(1.0, 1.0));
        store.remove_by_id(OverlayId(999));

        match &store.get(id).unwrap().kind {
            OverlayKind::ScrollingText(s) => {
                assert_eq!(s.x, Some(5.0));
                assert_eq!(s.y, 60.0);
            }
            other => panic!("unexpected {:?}", other.type_name()),
        }
    }

    #[test]
    fn clear_empties_store() {
        let mut store = OverlayStore::new();
        store.add("a", text("x"));
        store.clear();
        assert!(store.is_empty());
        assert!(store.get(OverlayId(1)).is_none());
    }
}
