//! The property layer: typed writes, effective reads, auto-generation.
//!
//! Nodes store only explicit values. An effective read resolves, in order:
//! the explicit value, an auto-generated value (which becomes explicit so it
//! stays stable), then the schema default. Auto-generation and defaults are
//! never logged; only explicit writes produce transaction records.

use tracing::{debug, trace};

use crate::history::TransactionRecord;
use crate::event::ModelEvent;
use crate::value::PropertyValue;

use super::model::{DesignModel, ModelError};
use super::node::NodeId;

impl DesignModel {
    /// Set a property to an explicit value.
    ///
    /// The value is checked against the declaration; numeric kinds coerce
    /// parseable strings into their numeric value, and the coerced form is
    /// what gets stored. Writing a value equal to the current explicit value
    /// is a silent no-op: no event, no record.
    pub fn set_property(
        &mut self,
        node: NodeId,
        name: &str,
        value: PropertyValue,
        dry_run: bool,
    ) -> Result<(), ModelError> {
        let ty = self.data(node)?.widget_type().to_owned();
        let Some(spec) = self.schema.property_spec(&ty, name)? else {
            return Err(ModelError::UnknownProperty {
                widget_type: ty,
                name: name.to_owned(),
            });
        };
        let expected = spec.kind.describe();
        let hook = spec.hook;
        let Some(stored) = spec.check(&value) else {
            debug!(name, expected, "property value rejected");
            return Err(ModelError::WrongPropertyType {
                name: name.to_owned(),
                expected,
            });
        };
        let old = self.data(node)?.explicit(name).cloned();
        if old.as_ref().is_some_and(|o| o.same_value(&stored)) {
            return Ok(());
        }
        if dry_run {
            return Ok(());
        }
        let transaction_data = match hook {
            Some(hook) => hook(Some(&stored), None),
            None => None,
        };
        self.write_explicit(node, name, Some(stored.clone()));
        self.bus.emit(ModelEvent::PropertyChanged {
            node,
            name: name.to_owned(),
            old: old.clone(),
            new: Some(stored.clone()),
        });
        self.history.record(TransactionRecord::PropertyChange {
            node,
            name: name.to_owned(),
            old,
            new: stored,
            transaction_data,
        });
        trace!(name, "property set");
        Ok(())
    }

    /// Effective read: explicit value, else auto-generated, else the schema
    /// default, else `None`.
    ///
    /// Takes `&mut self` because a first read of an auto-generated property
    /// assigns the generated value so later reads stay stable. That write is
    /// silent: no event, no transaction record.
    pub fn property(
        &mut self,
        node: NodeId,
        name: &str,
    ) -> Result<Option<PropertyValue>, ModelError> {
        let data = self.data(node)?;
        if let Some(value) = data.explicit(name) {
            return Ok(Some(value.clone()));
        }
        let ty = data.widget_type().to_owned();
        if !self.schema.has_property(&ty, name)? {
            return Err(ModelError::UnknownProperty {
                widget_type: ty,
                name: name.to_owned(),
            });
        }
        if let Some(prefix) = self.schema.auto_prefix_of(&ty, name)?.map(str::to_owned) {
            let generated = self.generate_value(&ty, name, &prefix);
            self.with_events_suppressed(|model| {
                model.write_explicit(node, name, Some(generated.clone()));
            });
            trace!(name, value = %generated, "property auto-generated");
            return Ok(Some(generated));
        }
        Ok(self.schema.property_default(&ty, name)?.cloned())
    }

    /// Next unique `"{prefix}{n}"` for nodes of this concrete type: one past
    /// the highest numeric suffix already assigned anywhere in the design.
    fn generate_value(&self, ty: &str, name: &str, prefix: &str) -> PropertyValue {
        let mut highest = 0u64;
        for other in self.walk(self.design()) {
            let Some(data) = self.nodes.get(other) else {
                continue;
            };
            if data.widget_type() != ty {
                continue;
            }
            let suffix = data
                .explicit(name)
                .and_then(PropertyValue::as_str)
                .and_then(|s| s.strip_prefix(prefix))
                .and_then(|s| s.parse::<u64>().ok());
            if let Some(n) = suffix {
                highest = highest.max(n);
            }
        }
        PropertyValue::String(format!("{prefix}{}", highest + 1))
    }

    /// Whether the property has an explicit value on this node.
    pub fn is_property_explicit(&self, node: NodeId, name: &str) -> Result<bool, ModelError> {
        Ok(self.data(node)?.is_explicit(name))
    }

    /// The schema default for a property of this node's type, ignoring any
    /// explicit value.
    pub fn property_default(
        &self,
        node: NodeId,
        name: &str,
    ) -> Result<Option<PropertyValue>, ModelError> {
        let ty = self.data(node)?.widget_type().to_owned();
        if !self.schema.has_property(&ty, name)? {
            return Err(ModelError::UnknownProperty {
                widget_type: ty,
                name: name.to_owned(),
            });
        }
        Ok(self.schema.property_default(&ty, name)?.cloned())
    }

    /// The option list for an options property of this node's type. Empty
    /// for other kinds.
    pub fn property_options(&self, node: NodeId, name: &str) -> Result<Vec<String>, ModelError> {
        let ty = self.data(node)?.widget_type().to_owned();
        if !self.schema.has_property(&ty, name)? {
            return Err(ModelError::UnknownProperty {
                widget_type: ty,
                name: name.to_owned(),
            });
        }
        Ok(self.schema.property_options(&ty, name)?.to_vec())
    }

    /// Every property the node's type carries with its effective value,
    /// base-type declarations first. May assign auto-generated values.
    pub fn properties(
        &mut self,
        node: NodeId,
    ) -> Result<Vec<(String, Option<PropertyValue>)>, ModelError> {
        let ty = self.data(node)?.widget_type().to_owned();
        let names: Vec<String> = self
            .schema
            .property_names(&ty)?
            .into_iter()
            .map(str::to_owned)
            .collect();
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let value = self.property(node, &name)?;
            out.push((name, value));
        }
        Ok(out)
    }
}
