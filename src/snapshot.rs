//! Tree snapshots: serializable captures of subtrees and whole designs.
//!
//! A snapshot records types, explicit properties, and zone structure; uids,
//! selection, and history never persist. Restoring validates everything
//! against the live schema, so a snapshot saved under an older catalog fails
//! with an ordinary [`ModelError`] instead of corrupting the tree.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::event::ModelEvent;
use crate::schema::DESIGN_TYPE;
use crate::tree::model::{DesignModel, ModelError};
use crate::tree::node::NodeId;
use crate::value::PropertyValue;

/// One zone and the snapshots of its children, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    /// The zone name.
    pub name: String,
    /// Child snapshots in zone order.
    pub children: Vec<NodeSnapshot>,
}

/// A serializable capture of one node and its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Concrete type name.
    pub widget_type: String,
    /// Explicitly-set properties only; defaults and auto-generation re-apply
    /// on restore.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
    /// Non-empty zones in schema precedence order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub zones: Vec<ZoneSnapshot>,
}

impl NodeSnapshot {
    /// A bare snapshot of a type with no properties or children.
    pub fn of_type(widget_type: impl Into<String>) -> Self {
        Self {
            widget_type: widget_type.into(),
            properties: BTreeMap::new(),
            zones: Vec::new(),
        }
    }

    /// Total node count of the snapshot, itself included.
    pub fn node_count(&self) -> usize {
        1 + self
            .zones
            .iter()
            .flat_map(|zone| &zone.children)
            .map(NodeSnapshot::node_count)
            .sum::<usize>()
    }
}

impl DesignModel {
    /// Capture the subtree rooted at `node`.
    pub fn capture(&self, node: NodeId) -> Result<NodeSnapshot, ModelError> {
        let data = self.data(node)?;
        let widget_type = data.widget_type().to_owned();
        let properties: BTreeMap<String, PropertyValue> = data
            .properties
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        let mut zones = Vec::new();
        for zone in self.schema.zones_of(&widget_type)? {
            let children = self.children(node, zone);
            if children.is_empty() {
                continue;
            }
            let mut snaps = Vec::with_capacity(children.len());
            for &child in children {
                snaps.push(self.capture(child)?);
            }
            zones.push(ZoneSnapshot {
                name: zone.to_owned(),
                children: snaps,
            });
        }
        Ok(NodeSnapshot {
            widget_type,
            properties,
            zones,
        })
    }

    /// Capture the whole design.
    pub fn capture_design(&self) -> Result<NodeSnapshot, ModelError> {
        self.capture(self.design())
    }

    /// Rebuild a snapshot's subtree and add it under `parent`.
    ///
    /// The subtree is constructed silently; listeners see one `NodeAdded` for
    /// the subtree root, and one undo removes the whole restoration. A
    /// snapshot the schema rejects leaves the tree unchanged (failed partial
    /// builds stay detached in the arena until the next reset).
    pub fn restore_child(
        &mut self,
        parent: NodeId,
        snapshot: &NodeSnapshot,
    ) -> Result<NodeId, ModelError> {
        let root = self.with_events_suppressed(|model| model.build_subtree(snapshot))?;
        let placed = self.add_child(parent, root, false)?;
        trace!(nodes = snapshot.node_count(), "subtree restored");
        Ok(placed)
    }

    /// Replace the whole design with a snapshot.
    ///
    /// The snapshot root must be Design-typed. The new tree is built and
    /// validated before the old one is dropped, so a bad snapshot leaves the
    /// current design intact. On success the arena holds only the new tree,
    /// selection and active page are cleared, history is cleared, and
    /// `DesignReset` fires.
    pub fn load_design(&mut self, snapshot: &NodeSnapshot) -> Result<NodeId, ModelError> {
        if !self.schema.is_type(&snapshot.widget_type, DESIGN_TYPE)? {
            return Err(ModelError::NotADesign {
                widget_type: snapshot.widget_type.clone(),
            });
        }
        let root = self.with_events_suppressed(|model| model.build_subtree(snapshot))?;

        let keep: HashSet<NodeId> = self.walk(root).into_iter().collect();
        let stale: Vec<NodeId> = self.nodes.keys().filter(|k| !keep.contains(k)).collect();
        for id in stale {
            self.nodes.remove(id);
            self.parent.remove(id);
            self.zone_of.remove(id);
        }
        self.design = root;
        self.selection = None;
        self.active_page = None;
        self.history.clear();
        self.bus.emit(ModelEvent::DesignReset { design: root });
        trace!(nodes = keep.len(), "design loaded");
        Ok(root)
    }

    /// Create the snapshot's nodes, properties validated, children attached
    /// zone by zone. Caller suppresses events.
    fn build_subtree(&mut self, snapshot: &NodeSnapshot) -> Result<NodeId, ModelError> {
        let node = self.create_node(&snapshot.widget_type)?;
        for (name, value) in &snapshot.properties {
            let Some(spec) = self.schema.property_spec(&snapshot.widget_type, name)? else {
                return Err(ModelError::UnknownProperty {
                    widget_type: snapshot.widget_type.clone(),
                    name: name.clone(),
                });
            };
            let expected = spec.kind.describe();
            let Some(stored) = spec.check(value) else {
                return Err(ModelError::WrongPropertyType {
                    name: name.clone(),
                    expected,
                });
            };
            self.write_explicit(node, name, Some(stored));
        }
        for zone in &snapshot.zones {
            for child_snapshot in &zone.children {
                let child = self.build_subtree(child_snapshot)?;
                let index = self.validate_attach(node, child, &zone.name, None)?;
                self.splice_in(node, child, &zone.name, index);
            }
        }
        Ok(node)
    }
}
