//! Node types: NodeId, UidAllocator, NodeData.

use std::collections::HashMap;

use slotmap::new_key_type;

use crate::value::PropertyValue;

new_key_type! {
    /// Arena handle for a node. Copy, lightweight (u64).
    pub struct NodeId;
}

/// Hands out process-unique node uids.
///
/// Uids are monotonic, never reused within a model, and not persisted across
/// sessions. Each [`DesignModel`](crate::tree::DesignModel) owns its own
/// allocator, so tests get isolated counters instead of hidden global state.
#[derive(Debug)]
pub struct UidAllocator {
    next: u64,
}

impl UidAllocator {
    /// Create an allocator starting at uid 1.
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocate the next uid.
    pub fn allocate(&mut self) -> u64 {
        let uid = self.next;
        self.next += 1;
        uid
    }
}

impl Default for UidAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Data associated with a single node in the design tree.
///
/// Children are organized by zone; the zone map is seeded with every zone the
/// schema declares for the node's type, so zone lookups never miss. The
/// `properties` map holds only explicitly-set values; an absent key means
/// "use the schema default or auto-generate".
#[derive(Debug, Clone)]
pub struct NodeData {
    uid: u64,
    widget_type: String,
    pub(crate) properties: HashMap<String, PropertyValue>,
    pub(crate) zones: HashMap<String, Vec<NodeId>>,
}

impl NodeData {
    /// Create node data for a type with the given schema-declared zones.
    pub(crate) fn new(uid: u64, widget_type: impl Into<String>, zone_names: &[&str]) -> Self {
        let zones = zone_names
            .iter()
            .map(|name| ((*name).to_owned(), Vec::new()))
            .collect();
        Self {
            uid,
            widget_type: widget_type.into(),
            properties: HashMap::new(),
            zones,
        }
    }

    /// The node's uid: unique within its model, immutable for its lifetime.
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Concrete widget type name.
    pub fn widget_type(&self) -> &str {
        &self.widget_type
    }

    /// Children of one zone, in order. Empty for unknown zone names.
    pub fn zone_children(&self, zone: &str) -> &[NodeId] {
        self.zones.get(zone).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total child count across all zones.
    pub fn child_count(&self) -> usize {
        self.zones.values().map(Vec::len).sum()
    }

    /// Whether the property was ever explicitly assigned.
    pub fn is_explicit(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// The explicit value, if one was assigned.
    pub fn explicit(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_allocator_is_monotonic() {
        let mut uids = UidAllocator::new();
        let a = uids.allocate();
        let b = uids.allocate();
        let c = uids.allocate();
        assert!(a < b && b < c);
    }

    #[test]
    fn new_seeds_declared_zones() {
        let data = NodeData::new(1, "Page", &["header", "content"]);
        assert_eq!(data.uid(), 1);
        assert_eq!(data.widget_type(), "Page");
        assert!(data.zone_children("header").is_empty());
        assert!(data.zone_children("content").is_empty());
        assert_eq!(data.child_count(), 0);
    }

    #[test]
    fn unknown_zone_is_empty() {
        let data = NodeData::new(1, "Button", &[]);
        assert!(data.zone_children("ghost").is_empty());
    }

    #[test]
    fn explicit_properties() {
        let mut data = NodeData::new(1, "Button", &[]);
        assert!(!data.is_explicit("text"));
        data.properties
            .insert("text".into(), PropertyValue::from("Save"));
        assert!(data.is_explicit("text"));
        assert_eq!(data.explicit("text"), Some(&PropertyValue::from("Save")));
    }
}
