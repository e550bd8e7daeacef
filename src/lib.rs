//! # maquette
//!
//! A constrained, schema-validated design-tree model with transactional
//! mutation, event notification, and generic undo/redo: the core data model
//! of an interactive UI designer.
//!
//! The tree holds widget nodes organized into named zones. A widget type
//! schema governs every placement: which types a zone accepts, how many
//! children it holds, which parents a type tolerates, and how incompatible
//! children get wrapped via redirect rules. Every mutation validates first,
//! announces itself on the model's event bus, and logs an invertible record,
//! so external renderers stay in sync and any step (or compound bracket of
//! steps) undoes cleanly.
//!
//! ## Core Systems
//!
//! - **[`value`]** — Typed property scalars with numeric-family coercion
//! - **[`schema`]** — Widget type descriptors, the compiled registry, and the built-in catalog
//! - **[`tree`]** — The slotmap-backed node arena, the model orchestrator, queries, properties
//! - **[`event`]** — Per-design event bus with topics and nested suppression
//! - **[`history`]** — Invertible transaction records and the bounded undo/redo log
//! - **[`snapshot`]** — Serializable subtree/design captures and validated restore

pub mod value;

pub mod schema;

pub mod tree;

pub mod event;
pub mod history;

pub mod snapshot;

pub use event::{EventTopic, ModelEvent, Notification, SubscriberId};
pub use schema::{
    Cardinality, PropertyKind, PropertySpec, SchemaError, SchemaRegistry, WidgetSpec, ZoneSpec,
};
pub use snapshot::{NodeSnapshot, ZoneSnapshot};
pub use tree::{DesignModel, ModelError, NodeId};
pub use value::PropertyValue;
