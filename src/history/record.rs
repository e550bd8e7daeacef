//! Transaction records: one invertible log entry per mutation kind.
//!
//! Records are always stored in forward orientation: undo applies the inverse
//! of a record, redo re-applies it forward. Each variant carries exactly the
//! fields needed to do both; the engine dispatches on the variant instead of
//! branching on tag strings, so a new mutation kind cannot silently fall
//! through to an "unexpected transaction" path.

use crate::tree::node::NodeId;
use crate::value::PropertyValue;

/// One entry in the transaction log.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionRecord {
    /// Opens a compound (bracketed) transaction.
    Begin,
    /// Closes a compound transaction; undo walks back to the matching `Begin`.
    End,
    /// A child was added to a zone (via the zone-precedence path).
    Add {
        /// The parent node.
        parent: NodeId,
        /// The added child.
        child: NodeId,
        /// The zone it landed in.
        zone: String,
        /// Its index within the zone.
        index: usize,
    },
    /// A child was inserted relative to a sibling. Inverts exactly like
    /// `Add`; kept distinct so the log reflects what the user did.
    InsertRelative {
        /// The parent node.
        parent: NodeId,
        /// The inserted child.
        child: NodeId,
        /// The zone it landed in.
        zone: String,
        /// Its resolved index within the zone.
        index: usize,
    },
    /// A child was removed; carries everything needed to reinsert it.
    Remove {
        /// The former parent.
        parent: NodeId,
        /// The removed child.
        child: NodeId,
        /// The zone it was removed from.
        zone: String,
        /// Its former index within the zone.
        index: usize,
    },
    /// A node moved atomically between locations.
    Move {
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
    PropertyChange {
        /// The affected node.
        node: NodeId,
        /// The property name.
        name: String,
        /// Prior explicit value; `None` if the property was unset.
        old: Option<PropertyValue>,
        /// The value that was set.
        new: PropertyValue,
        /// Opaque data the property hook returned; handed back verbatim on
        /// the next undo/redo replay.
        transaction_data: Option<PropertyValue>,
    },
}

impl TransactionRecord {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::End => "end",
            Self::Add { .. } => "add",
            Self::InsertRelative { .. } => "insertRelative",
            Self::Remove { .. } => "remove",
            Self::Move { .. } => "move",
            Self::PropertyChange { .. } => "propertyChange",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn kinds() {
        let mut sm: SlotMap<NodeId, ()> = SlotMap::with_key();
        let parent = sm.insert(());
        let child = sm.insert(());
        assert_eq!(TransactionRecord::Begin.kind(), "begin");
        assert_eq!(TransactionRecord::End.kind(), "end");
        let add = TransactionRecord::Add {
            parent,
            child,
            zone: "content".into(),
            index: 0,
        };
        assert_eq!(add.kind(), "add");
        let prop = TransactionRecord::PropertyChange {
            node: child,
            name: "text".into(),
            old: None,
            new: PropertyValue::from("Save"),
            transaction_data: None,
        };
        assert_eq!(prop.kind(), "propertyChange");
    }
}
