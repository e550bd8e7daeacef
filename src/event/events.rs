//! Model events: the closed set of state-change announcements.
//!
//! Every mutation the [`DesignModel`](crate::tree::DesignModel) performs is
//! announced as one [`ModelEvent`]. External renderers subscribe by
//! [`EventTopic`] and resynchronize from the payloads; the model never calls
//! back into renderers any other way.

use crate::tree::node::NodeId;
use crate::value::PropertyValue;

/// Subscription topics. The four model-updated variants share one topic,
/// mirroring how renderers treat any structural/property change as "the tree
/// under this design changed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTopic {
    /// A new design root was installed.
    DesignReset,
    /// The active page changed.
    ActivePageChanged,
    /// The selection changed.
    SelectionChanged,
    /// A node was added, removed, moved, or had a property changed.
    ModelUpdated,
}

/// A state-change announcement.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    /// A new design root was installed; listeners should rebuild everything.
    DesignReset {
        /// The new design root.
        design: NodeId,
    },
    /// The active page changed.
    ActivePageChanged {
        /// The new active page, if any.
        page: Option<NodeId>,
        /// The previously active page, if any.
        old_page: Option<NodeId>,
    },
    /// The selection changed.
    SelectionChanged {
        /// The newly selected node, or `None` for a cleared selection.
        node: Option<NodeId>,
        /// The selected node's uid, for listeners that track uids.
        uid: Option<u64>,
    },
    /// A node was inserted into a zone.
    NodeAdded {
        /// The inserted node.
        node: NodeId,
        /// Its new parent.
        parent: NodeId,
        /// The zone it landed in.
        zone: String,
        /// Its index within the zone.
        index: usize,
    },
    /// A node was removed from its zone.
    NodeRemoved {
        /// The removed node.
        node: NodeId,
        /// Its former parent.
        parent: NodeId,
        /// The zone it was removed from.
        zone: String,
        /// Its former index within the zone.
        index: usize,
    },
    /// A node moved in one atomic step; no separate remove/add was observable.
    NodeMoved {
        /// The moved node.
        node: NodeId,
        /// Former parent.
        old_parent: NodeId,
        /// Former zone.
        old_zone: String,
        /// Former index.
        old_index: usize,
        /// New parent.
        new_parent: NodeId,
        /// New zone.
        new_zone: String,
        /// New index.
        new_index: usize,
    },
    /// An explicit property value changed.
    PropertyChanged {
        /// The affected node.
        node: NodeId,
        /// The property name.
        name: String,
        /// The previous explicit value, `None` if it was unset.
        old: Option<PropertyValue>,
        /// The new explicit value, `None` when an undo restored the unset state.
        new: Option<PropertyValue>,
    },
}

impl ModelEvent {
    /// Human-readable event name for debug/logging purposes.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DesignReset { .. } => "DesignReset",
            Self::ActivePageChanged { .. } => "ActivePageChanged",
            Self::SelectionChanged { .. } => "SelectionChanged",
            Self::NodeAdded { .. } => "NodeAdded",
            Self::NodeRemoved { .. } => "NodeRemoved",
            Self::NodeMoved { .. } => "NodeMoved",
            Self::PropertyChanged { .. } => "PropertyChanged",
        }
    }

    /// The topic this event is delivered under.
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::DesignReset { .. } => EventTopic::DesignReset,
            Self::ActivePageChanged { .. } => EventTopic::ActivePageChanged,
            Self::SelectionChanged { .. } => EventTopic::SelectionChanged,
            Self::NodeAdded { .. }
            | Self::NodeRemoved { .. }
            | Self::NodeMoved { .. }
            | Self::PropertyChanged { .. } => EventTopic::ModelUpdated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn make_id(sm: &mut SlotMap<NodeId, ()>) -> NodeId {
        sm.insert(())
    }

    #[test]
    fn names() {
        let mut sm = SlotMap::with_key();
        let node = make_id(&mut sm);
        let parent = make_id(&mut sm);
        let event = ModelEvent::NodeAdded {
            node,
            parent,
            zone: "content".into(),
            index: 0,
        };
        assert_eq!(event.name(), "NodeAdded");
        assert_eq!(
            ModelEvent::DesignReset { design: node }.name(),
            "DesignReset"
        );
    }

    #[test]
    fn model_updated_family_shares_topic() {
        let mut sm = SlotMap::with_key();
        let node = make_id(&mut sm);
        let parent = make_id(&mut sm);
        let added = ModelEvent::NodeAdded {
            node,
            parent,
            zone: "content".into(),
            index: 0,
        };
        let changed = ModelEvent::PropertyChanged {
            node,
            name: "text".into(),
            old: None,
            new: Some(PropertyValue::from("Save")),
        };
        assert_eq!(added.topic(), EventTopic::ModelUpdated);
        assert_eq!(changed.topic(), EventTopic::ModelUpdated);
        assert_eq!(
            ModelEvent::SelectionChanged {
                node: Some(node),
                uid: Some(1)
            }
            .topic(),
            EventTopic::SelectionChanged
        );
    }
}
