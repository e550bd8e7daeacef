//! The design tree model: schema-checked structural mutation, selection,
//! active-page tracking, and the undo/redo engine.
//!
//! All nodes live in a single slotmap arena. Parent links and zone membership
//! are stored in secondary maps so lookup is O(1) and detaching is O(zone).
//! Every high-level mutator takes a `dry_run` flag: a dry run performs full
//! validation (including the redirect traversal) but mutates nothing and
//! emits nothing, so drag-and-drop feedback can probe "would this succeed?"
//! cheaply.
//!
//! Policy failures (zone full, type filters, last page) are ordinary `Err`
//! returns that leave the tree exactly as it was; they never panic. Stale or
//! malformed input is the programmer tier and may panic on internal
//! invariants, matching how the arena treats nonexistent keys.

use std::sync::Arc;

use slotmap::{SecondaryMap, SlotMap};
use tracing::{debug, trace};

use crate::event::{EventBus, ModelEvent, Notification, SubscriberId};
use crate::event::events::EventTopic;
use crate::history::{TransactionLog, TransactionRecord, DEFAULT_DEPTH};
use crate::schema::spec::Redirect;
use crate::schema::{SchemaError, SchemaRegistry, DESIGN_TYPE, PAGE_TYPE};
use crate::tree::node::{NodeData, NodeId, UidAllocator};
use crate::value::PropertyValue;

/// Errors from model operations.
///
/// Everything except `Schema` is the recoverable policy tier: the operation
/// was legal to attempt, the schema or tree state just refused it.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Schema-level failure (unknown type/zone): the programmer tier.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The node id does not refer to a live node of this model.
    #[error("node id is stale or belongs to another model")]
    StaleNode,

    /// The child already has a parent; detach or move it instead.
    #[error("node is already attached to a parent")]
    AlreadyAttached,

    /// The node has no parent.
    #[error("node is not attached to a parent")]
    NotAttached,

    /// The node is not reachable from this design root.
    #[error("node is not reachable from this design")]
    NotInDesign,

    /// Attaching here would make the node its own ancestor.
    #[error("cannot attach a node inside its own subtree")]
    WouldCreateCycle,

    /// The zone is at its declared cardinality.
    #[error("zone `{zone}` is full")]
    ZoneFull {
        /// The full zone.
        zone: String,
    },

    /// The zone's allow/deny lists reject the child type.
    #[error("zone `{zone}` does not allow children of type `{child}`")]
    ZoneRejectsChild {
        /// The rejecting zone.
        zone: String,
        /// The rejected child type.
        child: String,
    },

    /// The child type's `allowed_in`/`denied_in` lists reject the parent.
    #[error("type `{child}` does not allow `{parent}` as a parent")]
    ChildRejectsParent {
        /// The rejected parent type.
        parent: String,
        /// The child type doing the rejecting.
        child: String,
    },

    /// No zone accepts the child and no redirect applies.
    #[error("no zone of `{parent}` accepts a child of type `{child}`")]
    NoZoneAccepts {
        /// The parent type.
        parent: String,
        /// The child type.
        child: String,
    },

    /// `add_child_recursive` exhausted the ancestor chain.
    #[error("no ancestor of the target accepts a child of type `{child}`")]
    NoAncestorAccepts {
        /// The child type.
        child: String,
    },

    /// Index past the end of the zone (append position included).
    #[error("index {index} is out of bounds for zone `{zone}` (len {len})")]
    IndexOutOfBounds {
        /// The zone.
        zone: String,
        /// The rejected index.
        index: usize,
        /// Current occupant count.
        len: usize,
    },

    /// The type neither declares nor inherits the property.
    #[error("type `{widget_type}` has no property `{name}`")]
    UnknownProperty {
        /// The node's type.
        widget_type: String,
        /// The missing property name.
        name: String,
    },

    /// The value does not fit the declared property kind.
    #[error("property `{name}` expects {expected}")]
    WrongPropertyType {
        /// The property name.
        name: String,
        /// What the declaration expects.
        expected: &'static str,
    },

    /// Removing this page would leave the design without an active page.
    #[error("cannot remove the last page of a design")]
    LastPage,

    /// The schema marks this type non-selectable.
    #[error("type `{widget_type}` is not selectable")]
    NotSelectable {
        /// The non-selectable type.
        widget_type: String,
    },

    /// Active-page assignment requires a Page-typed node.
    #[error("`{widget_type}` is not a Page")]
    NotAPage {
        /// The offending type.
        widget_type: String,
    },

    /// Runtime redirect traversal revisited a wrapper type.
    #[error("redirect chain revisited type `{widget_type}`")]
    RedirectCycle {
        /// The revisited type.
        widget_type: String,
    },

    /// A design snapshot's root must be Design-typed.
    #[error("a design snapshot must have a `Design` root, got `{widget_type}`")]
    NotADesign {
        /// The snapshot root's type.
        widget_type: String,
    },
}

/// The design tree model. One instance owns one Design root, its event bus,
/// and its transaction log.
pub struct DesignModel {
    pub(crate) schema: Arc<SchemaRegistry>,
    pub(crate) nodes: SlotMap<NodeId, NodeData>,
    pub(crate) parent: SecondaryMap<NodeId, NodeId>,
    pub(crate) zone_of: SecondaryMap<NodeId, String>,
    pub(crate) uids: UidAllocator,
    pub(crate) bus: EventBus,
    pub(crate) history: TransactionLog,
    pub(crate) design: NodeId,
    pub(crate) selection: Option<NodeId>,
    pub(crate) active_page: Option<NodeId>,
}

impl DesignModel {
    /// Create a model with a fresh Design root and the default history depth.
    ///
    /// The schema must define the `Design` type.
    pub fn new(schema: Arc<SchemaRegistry>) -> Result<Self, ModelError> {
        Self::with_history_depth(schema, DEFAULT_DEPTH)
    }

    /// Create a model with a custom undo depth limit.
    pub fn with_history_depth(
        schema: Arc<SchemaRegistry>,
        depth: usize,
    ) -> Result<Self, ModelError> {
        schema.spec(DESIGN_TYPE)?;
        let mut model = Self {
            schema,
            nodes: SlotMap::with_key(),
            parent: SecondaryMap::new(),
            zone_of: SecondaryMap::new(),
            uids: UidAllocator::new(),
            bus: EventBus::new(),
            history: TransactionLog::with_depth(depth),
            design: NodeId::default(),
            selection: None,
            active_page: None,
        };
        model.design = model.create_node(DESIGN_TYPE)?;
        Ok(model)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The Design root.
    pub fn design(&self) -> NodeId {
        self.design
    }

    /// The schema this model validates against.
    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    /// Whether the id refers to a live node (attached or detached).
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    pub(crate) fn data(&self, node: NodeId) -> Result<&NodeData, ModelError> {
        self.nodes.get(node).ok_or(ModelError::StaleNode)
    }

    /// The node's uid.
    pub fn uid(&self, node: NodeId) -> Result<u64, ModelError> {
        Ok(self.data(node)?.uid())
    }

    /// The node's concrete type name.
    pub fn widget_type(&self, node: NodeId) -> Result<&str, ModelError> {
        Ok(self.data(node)?.widget_type())
    }

    /// The node's type chain, concrete type first.
    pub fn type_chain(&self, node: NodeId) -> Result<&[String], ModelError> {
        let ty = self.data(node)?.widget_type();
        Ok(self.schema.type_chain(ty)?)
    }

    /// The node's parent, if attached.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parent.get(node).copied()
    }

    /// The name of the zone holding this node in its parent.
    pub fn zone_name(&self, node: NodeId) -> Option<&str> {
        self.zone_of.get(node).map(String::as_str)
    }

    /// Children of one zone, in order. Empty for stale ids or unknown zones.
    pub fn children(&self, node: NodeId, zone: &str) -> &[NodeId] {
        self.nodes
            .get(node)
            .map(|data| data.zone_children(zone))
            .unwrap_or(&[])
    }

    /// The node's zone names in schema declaration order.
    pub fn zones(&self, node: NodeId) -> Result<Vec<&str>, ModelError> {
        let ty = self.data(node)?.widget_type();
        Ok(self.schema.zones_of(ty)?)
    }

    /// The current selection.
    pub fn selected(&self) -> Option<NodeId> {
        self.selection
    }

    /// The current active page.
    pub fn active_page(&self) -> Option<NodeId> {
        self.active_page
    }

    /// Subscribe to model events; `None` subscribes to every topic.
    pub fn subscribe(
        &mut self,
        topic: Option<EventTopic>,
        callback: impl FnMut(&Notification) + 'static,
    ) -> SubscriberId {
        self.bus.subscribe(topic, callback)
    }

    /// Remove an event subscription.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.bus.unsubscribe(id)
    }

    // -----------------------------------------------------------------------
    // Construction & reset
    // -----------------------------------------------------------------------

    /// Create a detached node of the given type.
    ///
    /// The type name is validated against the schema; zones are seeded from
    /// its declarations. The node is not logged or announced until attached.
    pub fn create_node(&mut self, widget_type: &str) -> Result<NodeId, ModelError> {
        let zones = self.schema.zones_of(widget_type)?;
        let uid = self.uids.allocate();
        let data = NodeData::new(uid, widget_type, &zones);
        let id = self.nodes.insert(data);
        trace!(widget_type, uid, "node created");
        Ok(id)
    }

    /// Install a fresh, empty Design root.
    ///
    /// Drops every node (attached or detached), clears selection, active page,
    /// and both history stacks, then fires `DesignReset`.
    pub fn reset_design(&mut self) -> NodeId {
        self.nodes.clear();
        self.parent.clear();
        self.zone_of.clear();
        self.selection = None;
        self.active_page = None;
        self.history.clear();
        let design = self
            .create_node(DESIGN_TYPE)
            .expect("schema was validated at construction");
        self.design = design;
        self.bus.emit(ModelEvent::DesignReset { design });
        design
    }

    // -----------------------------------------------------------------------
    // Raw splicing (no validation, no history; events via the bus)
    // -----------------------------------------------------------------------

    pub(crate) fn splice_in(&mut self, parent: NodeId, child: NodeId, zone: &str, index: usize) {
        let data = self.nodes.get_mut(parent).expect("parent must exist");
        let children = data
            .zones
            .get_mut(zone)
            .expect("zone must be declared for the parent type");
        children.insert(index, child);
        self.parent.insert(child, parent);
        self.zone_of.insert(child, zone.to_owned());
        self.bus.emit(ModelEvent::NodeAdded {
            node: child,
            parent,
            zone: zone.to_owned(),
            index,
        });
    }

    pub(crate) fn splice_out(&mut self, child: NodeId) -> (NodeId, String, usize) {
        let parent = self.parent.remove(child).expect("child must be attached");
        let zone = self.zone_of.remove(child).expect("attached child has a zone");
        let data = self.nodes.get_mut(parent).expect("parent must exist");
        let children = data
            .zones
            .get_mut(&zone)
            .expect("zone must be declared for the parent type");
        let index = children
            .iter()
            .position(|&c| c == child)
            .expect("child must occupy its recorded zone");
        children.remove(index);
        self.bus.emit(ModelEvent::NodeRemoved {
            node: child,
            parent,
            zone: zone.clone(),
            index,
        });
        (parent, zone, index)
    }

    /// Run `f` with event delivery suppressed, resuming on every exit path.
    pub(crate) fn with_events_suppressed<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.bus.suppress();
        let result = f(self);
        self.bus.resume();
        result
    }

    fn clear_selection_if_within(&mut self, subtree_root: NodeId) {
        let lost = self
            .selection
            .is_some_and(|sel| self.is_descendant_or_self(sel, subtree_root));
        if lost {
            self.selection = None;
            self.bus.emit(ModelEvent::SelectionChanged {
                node: None,
                uid: None,
            });
        }
    }

    fn repair_active_page_after_detach(&mut self, subtree_root: NodeId) {
        let dangling = self
            .active_page
            .is_some_and(|page| self.is_descendant_or_self(page, subtree_root));
        if dangling {
            let old = self.active_page;
            let replacement = self.find_other_page(subtree_root);
            self.active_page = replacement;
            self.bus.emit(ModelEvent::ActivePageChanged {
                page: replacement,
                old_page: old,
            });
        }
    }

    fn find_other_page(&self, excluding: NodeId) -> Option<NodeId> {
        let zones = self.zones(self.design).ok()?;
        for zone in zones {
            for &child in self.children(self.design, zone) {
                if child == excluding || self.is_descendant_or_self(child, excluding) {
                    continue;
                }
                let ty = self.nodes.get(child)?.widget_type();
                if self.schema.is_type(ty, PAGE_TYPE).unwrap_or(false) {
                    return Some(child);
                }
            }
        }
        None
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub(crate) fn validate_attach(
        &self,
        parent: NodeId,
        child: NodeId,
        zone: &str,
        index: Option<usize>,
    ) -> Result<usize, ModelError> {
        let parent_ty = self.data(parent)?.widget_type().to_owned();
        let child_ty = self.data(child)?.widget_type().to_owned();
        if self.parent(child).is_some() {
            return Err(ModelError::AlreadyAttached);
        }
        if self.is_descendant_or_self(parent, child) {
            return Err(ModelError::WouldCreateCycle);
        }
        let zone_spec = self.schema.zone_spec(&parent_ty, zone)?;
        if !self.schema.zone_allows_child(&parent_ty, zone, &child_ty)? {
            return Err(ModelError::ZoneRejectsChild {
                zone: zone.to_owned(),
                child: child_ty,
            });
        }
        if !self.schema.child_allows_parent(&parent_ty, &child_ty)? {
            return Err(ModelError::ChildRejectsParent {
                parent: parent_ty,
                child: child_ty,
            });
        }
        let len = self.children(parent, zone).len();
        if !zone_spec.cardinality.has_room(len) {
            return Err(ModelError::ZoneFull {
                zone: zone.to_owned(),
            });
        }
        let index = index.unwrap_or(len);
        if index > len {
            return Err(ModelError::IndexOutOfBounds {
                zone: zone.to_owned(),
                index,
                len,
            });
        }
        Ok(index)
    }

    fn attach(
        &mut self,
        parent: NodeId,
        child: NodeId,
        zone: &str,
        index: Option<usize>,
        dry_run: bool,
        relative: bool,
    ) -> Result<NodeId, ModelError> {
        let index = self.validate_attach(parent, child, zone, index).map_err(|err| {
            debug!(error = %err, zone, "attach rejected");
            err
        })?;
        if dry_run {
            return Ok(child);
        }
        self.splice_in(parent, child, zone, index);
        let record = if relative {
            TransactionRecord::InsertRelative {
                parent,
                child,
                zone: zone.to_owned(),
                index,
            }
        } else {
            TransactionRecord::Add {
                parent,
                child,
                zone: zone.to_owned(),
                index,
            }
        };
        self.history.record(record);
        trace!(zone, index, "child attached");
        Ok(child)
    }

    // -----------------------------------------------------------------------
    // Structural mutation
    // -----------------------------------------------------------------------

    /// Add `child` to the first zone of `parent` that accepts it, falling
    /// back to the parent type's redirect rule when no zone does.
    ///
    /// The redirect path reuses an existing wrapper already in the redirect
    /// zone when possible; otherwise it constructs one, adds the child to it
    /// (recursively, bounded against redirect cycles), and inserts the
    /// wrapper. A materializing redirect is bracketed begin/end so one undo
    /// removes wrapper and child together.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        dry_run: bool,
    ) -> Result<NodeId, ModelError> {
        let mut visited = Vec::new();
        self.add_child_guarded(parent, child, dry_run, &mut visited)
    }

    fn add_child_guarded(
        &mut self,
        parent: NodeId,
        child: NodeId,
        dry_run: bool,
        visited: &mut Vec<String>,
    ) -> Result<NodeId, ModelError> {
        let parent_ty = self.data(parent)?.widget_type().to_owned();
        let child_ty = self.data(child)?.widget_type().to_owned();
        if self.parent(child).is_some() {
            return Err(ModelError::AlreadyAttached);
        }
        if self.is_descendant_or_self(parent, child) {
            return Err(ModelError::WouldCreateCycle);
        }

        let zones = self.schema.zones_for_child(&parent_ty, &child_ty)?;
        let mut last_err = None;
        for zone in &zones {
            match self.attach(parent, child, zone, None, dry_run, false) {
                Ok(id) => return Ok(id),
                Err(err) => last_err = Some(err),
            }
        }

        // No zone takes the child directly; consult the redirect rule.
        if let Some(redirect) = self.schema.redirect_of(&parent_ty)?.cloned() {
            match self.add_via_redirect(parent, &parent_ty, child, &child_ty, &redirect, dry_run, visited)
            {
                Ok(id) => return Ok(id),
                Err(err) => {
                    if last_err.is_none() {
                        last_err = Some(err);
                    }
                }
            }
        }

        let err = last_err.unwrap_or(ModelError::NoZoneAccepts {
            parent: parent_ty,
            child: child_ty,
        });
        debug!(error = %err, "add_child rejected");
        Err(err)
    }

    #[allow(clippy::too_many_arguments)]
    fn add_via_redirect(
        &mut self,
        parent: NodeId,
        parent_ty: &str,
        child: NodeId,
        child_ty: &str,
        redirect: &Redirect,
        dry_run: bool,
        visited: &mut Vec<String>,
    ) -> Result<NodeId, ModelError> {
        if visited.iter().any(|t| t == &redirect.widget_type) {
            return Err(ModelError::RedirectCycle {
                widget_type: redirect.widget_type.clone(),
            });
        }
        visited.push(redirect.widget_type.clone());

        // (a) Reuse a wrapper instance already sitting in the redirect zone.
        let existing = self.children(parent, &redirect.zone).to_vec();
        for wrapper in existing {
            let wrapper_ty = self.data(wrapper)?.widget_type().to_owned();
            if self.schema.is_type(&wrapper_ty, &redirect.widget_type)?
                && self.add_child_guarded(wrapper, child, dry_run, visited).is_ok()
            {
                return Ok(child);
            }
        }

        // (b) Construct a new wrapper. The whole plan is validated before any
        // mutation, so a refusal leaves no partial state behind.
        self.validate_redirect_plan(parent, parent_ty, child_ty, redirect, visited)?;
        if dry_run {
            return Ok(child);
        }
        self.history.begin();
        let wrapper = self.create_node(&redirect.widget_type)?;
        let placed = self
            .add_child_guarded(wrapper, child, false, visited)
            .and_then(|_| self.attach(parent, wrapper, &redirect.zone, None, false, false));
        self.history.end();
        debug_assert!(placed.is_ok(), "validated redirect plan must apply");
        placed.map(|_| child)
    }

    fn validate_redirect_plan(
        &self,
        parent: NodeId,
        parent_ty: &str,
        child_ty: &str,
        redirect: &Redirect,
        visited: &[String],
    ) -> Result<(), ModelError> {
        if !self
            .schema
            .child_allows_parent(parent_ty, &redirect.widget_type)?
        {
            return Err(ModelError::ChildRejectsParent {
                parent: parent_ty.to_owned(),
                child: redirect.widget_type.clone(),
            });
        }
        if !self
            .schema
            .zone_allows_child(parent_ty, &redirect.zone, &redirect.widget_type)?
        {
            return Err(ModelError::ZoneRejectsChild {
                zone: redirect.zone.clone(),
                child: redirect.widget_type.clone(),
            });
        }
        let len = self.children(parent, &redirect.zone).len();
        if !self
            .schema
            .cardinality_of(parent_ty, &redirect.zone)?
            .has_room(len)
        {
            return Err(ModelError::ZoneFull {
                zone: redirect.zone.clone(),
            });
        }
        let mut chain = visited.to_vec();
        if !self.type_accepts_child(&redirect.widget_type, child_ty, &mut chain)? {
            return Err(ModelError::NoZoneAccepts {
                parent: redirect.widget_type.clone(),
                child: child_ty.to_owned(),
            });
        }
        Ok(())
    }

    /// Pure-schema check: would a fresh `host_ty` instance accept a
    /// `child_ty` child, directly or through its own redirect chain?
    fn type_accepts_child(
        &self,
        host_ty: &str,
        child_ty: &str,
        visited: &mut Vec<String>,
    ) -> Result<bool, ModelError> {
        if !self.schema.zones_for_child(host_ty, child_ty)?.is_empty() {
            return Ok(true);
        }
        if let Some(redirect) = self.schema.redirect_of(host_ty)?.cloned() {
            if visited.iter().any(|t| t == &redirect.widget_type) {
                return Ok(false);
            }
            visited.push(redirect.widget_type.clone());
            let wrapper_fits = self
                .schema
                .zone_allows_child(host_ty, &redirect.zone, &redirect.widget_type)?
                && self
                    .schema
                    .child_allows_parent(host_ty, &redirect.widget_type)?;
            if wrapper_fits && self.type_accepts_child(&redirect.widget_type, child_ty, visited)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Add `child` to `zone` of `parent`, appending when `index` is `None`.
    pub fn add_child_to_zone(
        &mut self,
        parent: NodeId,
        child: NodeId,
        zone: &str,
        index: Option<usize>,
        dry_run: bool,
    ) -> Result<NodeId, ModelError> {
        self.attach(parent, child, zone, index, dry_run, false)
    }

    /// Insert `child` next to `sibling`: offset 0 = before, 1 = after.
    /// The resolved index is clamped into the zone's bounds.
    pub fn insert_child_relative(
        &mut self,
        sibling: NodeId,
        child: NodeId,
        offset: usize,
        dry_run: bool,
    ) -> Result<NodeId, ModelError> {
        self.data(sibling)?;
        let Some(parent) = self.parent(sibling) else {
            return Err(ModelError::NotAttached);
        };
        let zone = self
            .zone_of
            .get(sibling)
            .cloned()
            .expect("attached node has a zone");
        let children = self.children(parent, &zone);
        let position = children
            .iter()
            .position(|&c| c == sibling)
            .expect("sibling must occupy its recorded zone");
        let index = (position + offset).min(children.len());
        self.attach(parent, child, &zone, Some(index), dry_run, true)
    }

    /// Insert `child` immediately before `sibling`.
    pub fn insert_child_before(
        &mut self,
        sibling: NodeId,
        child: NodeId,
        dry_run: bool,
    ) -> Result<NodeId, ModelError> {
        self.insert_child_relative(sibling, child, 0, dry_run)
    }

    /// Insert `child` immediately after `sibling`.
    pub fn insert_child_after(
        &mut self,
        sibling: NodeId,
        child: NodeId,
        dry_run: bool,
    ) -> Result<NodeId, ModelError> {
        self.insert_child_relative(sibling, child, 1, dry_run)
    }

    /// Walk up from `start` trying each ancestor as the parent until one
    /// accepts the child.
    pub fn add_child_recursive(
        &mut self,
        start: NodeId,
        child: NodeId,
        dry_run: bool,
    ) -> Result<NodeId, ModelError> {
        self.data(start)?;
        let child_ty = self.data(child)?.widget_type().to_owned();
        let mut current = Some(start);
        while let Some(parent) = current {
            if self.add_child(parent, child, dry_run).is_ok() {
                return Ok(child);
            }
            current = self.parent(parent);
        }
        Err(ModelError::NoAncestorAccepts { child: child_ty })
    }

    /// Detach `child` from its parent.
    ///
    /// Pages get the lifecycle guard first: an active page hands activity to a
    /// sibling page, and removing the only page is refused (`LastPage`) — the
    /// caller must add a replacement page first, bracketing both steps in a
    /// compound transaction.
    pub fn remove_child(&mut self, child: NodeId, dry_run: bool) -> Result<NodeId, ModelError> {
        let ty = self.data(child)?.widget_type().to_owned();
        if self.parent(child).is_none() {
            return Err(ModelError::NotAttached);
        }
        if self.schema.is_type(&ty, PAGE_TYPE)? {
            self.ensure_page_inactive(child, dry_run).map_err(|err| {
                debug!(error = %err, "remove_child rejected");
                err
            })?;
        }
        if dry_run {
            return Ok(child);
        }
        let (parent, zone, index) = self.splice_out(child);
        self.clear_selection_if_within(child);
        self.history.record(TransactionRecord::Remove {
            parent,
            child,
            zone,
            index,
        });
        trace!("child removed");
        Ok(child)
    }

    /// Page-lifecycle guard: if `page` is the active page, hand activity to
    /// another page of the design, or refuse with `LastPage` if none exists.
    pub fn ensure_page_inactive(&mut self, page: NodeId, dry_run: bool) -> Result<(), ModelError> {
        if self.active_page != Some(page) {
            return Ok(());
        }
        match self.find_other_page(page) {
            Some(other) => {
                if !dry_run {
                    self.set_active_page(other)?;
                }
                Ok(())
            }
            None => Err(ModelError::LastPage),
        }
    }

    /// Move a node to a new parent/zone/index in one atomic step.
    ///
    /// The target is validated in full before anything is touched, so a
    /// refused move leaves the tree byte-for-byte as it was. Listeners see a
    /// single `NodeMoved` event, never an intermediate remove/add pair.
    pub fn move_node(
        &mut self,
        node: NodeId,
        new_parent: NodeId,
        new_zone: &str,
        new_index: Option<usize>,
        dry_run: bool,
    ) -> Result<NodeId, ModelError> {
        let node_ty = self.data(node)?.widget_type().to_owned();
        let parent_ty = self.data(new_parent)?.widget_type().to_owned();
        let Some(old_parent) = self.parent(node) else {
            return Err(ModelError::NotAttached);
        };
        let old_zone = self
            .zone_of
            .get(node)
            .cloned()
            .expect("attached node has a zone");
        let old_index = self
            .children(old_parent, &old_zone)
            .iter()
            .position(|&c| c == node)
            .expect("node must occupy its recorded zone");

        if self.is_descendant_or_self(new_parent, node) {
            return Err(ModelError::WouldCreateCycle);
        }
        let zone_spec = self.schema.zone_spec(&parent_ty, new_zone)?;
        if !self.schema.zone_allows_child(&parent_ty, new_zone, &node_ty)? {
            return Err(ModelError::ZoneRejectsChild {
                zone: new_zone.to_owned(),
                child: node_ty,
            });
        }
        if !self.schema.child_allows_parent(&parent_ty, &node_ty)? {
            return Err(ModelError::ChildRejectsParent {
                parent: parent_ty,
                child: node_ty,
            });
        }
        // Occupancy and bounds are checked against the zone as it will look
        // after the node has left its old slot.
        let same_zone = new_parent == old_parent && new_zone == old_zone;
        let len = self.children(new_parent, new_zone).len() - usize::from(same_zone);
        if !zone_spec.cardinality.has_room(len) {
            return Err(ModelError::ZoneFull {
                zone: new_zone.to_owned(),
            });
        }
        let new_index = new_index.unwrap_or(len);
        if new_index > len {
            return Err(ModelError::IndexOutOfBounds {
                zone: new_zone.to_owned(),
                index: new_index,
                len,
            });
        }
        if dry_run {
            return Ok(node);
        }

        self.with_events_suppressed(|model| {
            model.splice_out(node);
            model.splice_in(new_parent, node, new_zone, new_index);
        });
        self.bus.emit(ModelEvent::NodeMoved {
            node,
            old_parent,
            old_zone: old_zone.clone(),
            old_index,
            new_parent,
            new_zone: new_zone.to_owned(),
            new_index,
        });
        self.history.record(TransactionRecord::Move {
            node,
            old_parent,
            old_zone,
            old_index,
            new_parent,
            new_zone: new_zone.to_owned(),
            new_index,
        });
        trace!("node moved");
        Ok(node)
    }

    // -----------------------------------------------------------------------
    // Selection & active page
    // -----------------------------------------------------------------------

    /// Set or clear the selection.
    ///
    /// The node must be reachable from this design and schema-selectable.
    /// Selecting a node inside a non-active page makes that page active,
    /// firing `ActivePageChanged` before `SelectionChanged`.
    pub fn set_selected(&mut self, node: Option<NodeId>) -> Result<(), ModelError> {
        let Some(node) = node else {
            if self.selection.is_some() {
                self.selection = None;
                self.bus.emit(ModelEvent::SelectionChanged {
                    node: None,
                    uid: None,
                });
            }
            return Ok(());
        };
        let data = self.data(node)?;
        let uid = data.uid();
        let ty = data.widget_type().to_owned();
        if !self.is_attached(node) {
            return Err(ModelError::NotInDesign);
        }
        if !self.schema.selectable(&ty)? {
            return Err(ModelError::NotSelectable { widget_type: ty });
        }
        if self.selection == Some(node) {
            return Ok(());
        }
        if let Some(page) = self.enclosing_page(node) {
            if self.active_page != Some(page) {
                self.set_active_page(page)?;
            }
        }
        self.selection = Some(node);
        self.bus.emit(ModelEvent::SelectionChanged {
            node: Some(node),
            uid: Some(uid),
        });
        Ok(())
    }

    /// Make `page` the active page. The node must be Page-typed and attached;
    /// there is deliberately no way to clear the active page directly.
    pub fn set_active_page(&mut self, page: NodeId) -> Result<(), ModelError> {
        let ty = self.data(page)?.widget_type().to_owned();
        if !self.schema.is_type(&ty, PAGE_TYPE)? {
            return Err(ModelError::NotAPage { widget_type: ty });
        }
        if !self.is_attached(page) {
            return Err(ModelError::NotInDesign);
        }
        if self.active_page == Some(page) {
            return Ok(());
        }
        let old = self.active_page;
        self.active_page = Some(page);
        self.bus.emit(ModelEvent::ActivePageChanged {
            page: Some(page),
            old_page: old,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Open a compound transaction (nestable).
    pub fn begin_transaction(&mut self) {
        self.history.begin();
    }

    /// Close a compound transaction. Returns `false` on an unmatched call.
    pub fn end_transaction(&mut self) -> bool {
        self.history.end()
    }

    /// Undo one step: a single record, or a whole compound bracket as one
    /// atomic visual undo. Returns whether anything was undone.
    pub fn undo(&mut self) -> bool {
        if self.history.open_depth() > 0 {
            debug!("undo refused: a transaction is open");
            return false;
        }
        let Some(record) = self.history.pop_undo() else {
            return false;
        };
        match record {
            TransactionRecord::End => {
                self.history.push_redo(TransactionRecord::End);
                while let Some(inner) = self.history.pop_undo() {
                    if matches!(inner, TransactionRecord::Begin) {
                        self.history.push_redo(TransactionRecord::Begin);
                        break;
                    }
                    let replay = self.revert_record(inner);
                    self.history.push_redo(replay);
                }
            }
            // A lone Begin can surface after depth eviction; nothing to invert.
            TransactionRecord::Begin => self.history.push_redo(TransactionRecord::Begin),
            other => {
                let replay = self.revert_record(other);
                self.history.push_redo(replay);
            }
        }
        trace!("undo applied");
        true
    }

    /// Redo one step; the mirror of [`undo`](Self::undo).
    pub fn redo(&mut self) -> bool {
        if self.history.open_depth() > 0 {
            debug!("redo refused: a transaction is open");
            return false;
        }
        let Some(record) = self.history.pop_redo() else {
            return false;
        };
        match record {
            TransactionRecord::Begin => {
                self.history.push_undo(TransactionRecord::Begin);
                while let Some(inner) = self.history.pop_redo() {
                    if matches!(inner, TransactionRecord::End) {
                        self.history.push_undo(TransactionRecord::End);
                        break;
                    }
                    let replay = self.apply_record(inner);
                    self.history.push_undo(replay);
                }
            }
            TransactionRecord::End => self.history.push_undo(TransactionRecord::End),
            other => {
                let replay = self.apply_record(other);
                self.history.push_undo(replay);
            }
        }
        trace!("redo applied");
        true
    }

    /// Apply the inverse of a (forward-oriented) record and return the record
    /// to push onto the redo stack.
    fn revert_record(&mut self, record: TransactionRecord) -> TransactionRecord {
        match record {
            TransactionRecord::Add { parent, child, ref zone, index }
            | TransactionRecord::InsertRelative { parent, child, ref zone, index } => {
                let _ = (parent, zone, index);
                self.splice_out(child);
                self.clear_selection_if_within(child);
                self.repair_active_page_after_detach(child);
                record
            }
            TransactionRecord::Remove { parent, child, ref zone, index } => {
                self.splice_in(parent, child, zone, index);
                record
            }
            TransactionRecord::Move {
                node,
                old_parent,
                ref old_zone,
                old_index,
                new_parent,
                ref new_zone,
                new_index,
            } => {
                self.with_events_suppressed(|model| {
                    model.splice_out(node);
                    model.splice_in(old_parent, node, old_zone, old_index);
                });
                self.bus.emit(ModelEvent::NodeMoved {
                    node,
                    old_parent: new_parent,
                    old_zone: new_zone.clone(),
                    old_index: new_index,
                    new_parent: old_parent,
                    new_zone: old_zone.clone(),
                    new_index: old_index,
                });
                record
            }
            TransactionRecord::PropertyChange {
                node,
                name,
                old,
                new,
                transaction_data,
            } => {
                let hook = self
                    .data(node)
                    .ok()
                    .and_then(|data| {
                        self.schema
                            .property_spec(data.widget_type(), &name)
                            .ok()
                            .flatten()
                    })
                    .and_then(|spec| spec.hook);
                let next_data = match hook {
                    Some(hook) => hook(old.as_ref(), transaction_data.as_ref()),
                    None => transaction_data,
                };
                self.write_explicit(node, &name, old.clone());
                self.bus.emit(ModelEvent::PropertyChanged {
                    node,
                    name: name.clone(),
                    old: Some(new.clone()),
                    new: old.clone(),
                });
                TransactionRecord::PropertyChange {
                    node,
                    name,
                    old,
                    new,
                    transaction_data: next_data,
                }
            }
            bracket @ (TransactionRecord::Begin | TransactionRecord::End) => bracket,
        }
    }

    /// Re-apply a (forward-oriented) record and return the record to push
    /// back onto the undo stack.
    fn apply_record(&mut self, record: TransactionRecord) -> TransactionRecord {
        match record {
            TransactionRecord::Add { parent, child, ref zone, index }
            | TransactionRecord::InsertRelative { parent, child, ref zone, index } => {
                self.splice_in(parent, child, zone, index);
                record
            }
            TransactionRecord::Remove { parent, child, ref zone, index } => {
                let _ = (parent, zone, index);
                self.splice_out(child);
                self.clear_selection_if_within(child);
                self.repair_active_page_after_detach(child);
                record
            }
            TransactionRecord::Move {
                node,
                old_parent,
                ref old_zone,
                old_index,
                new_parent,
                ref new_zone,
                new_index,
            } => {
                let _ = (old_parent, old_index);
                self.with_events_suppressed(|model| {
                    model.splice_out(node);
                    model.splice_in(new_parent, node, new_zone, new_index);
                });
                self.bus.emit(ModelEvent::NodeMoved {
                    node,
                    old_parent,
                    old_zone: old_zone.clone(),
                    old_index,
                    new_parent,
                    new_zone: new_zone.clone(),
                    new_index,
                });
                record
            }
            TransactionRecord::PropertyChange {
                node,
                name,
                old,
                new,
                transaction_data,
            } => {
                let hook = self
                    .data(node)
                    .ok()
                    .and_then(|data| {
                        self.schema
                            .property_spec(data.widget_type(), &name)
                            .ok()
                            .flatten()
                    })
                    .and_then(|spec| spec.hook);
                let next_data = match hook {
                    Some(hook) => hook(Some(&new), transaction_data.as_ref()),
                    None => transaction_data,
                };
                self.write_explicit(node, &name, Some(new.clone()));
                self.bus.emit(ModelEvent::PropertyChanged {
                    node,
                    name: name.clone(),
                    old: old.clone(),
                    new: Some(new.clone()),
                });
                TransactionRecord::PropertyChange {
                    node,
                    name,
                    old,
                    new,
                    transaction_data: next_data,
                }
            }
            bracket @ (TransactionRecord::Begin | TransactionRecord::End) => bracket,
        }
    }

    /// Number of records currently undoable / redoable.
    pub fn history_len(&self) -> (usize, usize) {
        (self.history.undo_len(), self.history.redo_len())
    }

    pub(crate) fn write_explicit(
        &mut self,
        node: NodeId,
        name: &str,
        value: Option<PropertyValue>,
    ) {
        if let Some(data) = self.nodes.get_mut(node) {
            match value {
                Some(value) => {
                    data.properties.insert(name.to_owned(), value);
                }
                None => {
                    data.properties.remove(name);
                }
            }
        }
    }
}

impl std::fmt::Debug for DesignModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesignModel")
            .field("nodes", &self.nodes.len())
            .field("design", &self.design)
            .field("selection", &self.selection)
            .field("active_page", &self.active_page)
            .finish()
    }
}
