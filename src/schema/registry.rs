//! The schema registry: compiled, validated widget type table.
//!
//! [`SchemaRegistry`] is built once from a list of [`WidgetSpec`]s and is
//! read-only afterwards. Construction precomputes each type's ancestor chain
//! and effective zone list, and rejects malformed schemas: duplicate names,
//! unknown parents, inheritance cycles, and redirect rules that reference
//! unknown zones/types or form a cycle.

use std::collections::HashMap;

use super::spec::{Cardinality, PropertySpec, Redirect, WidgetSpec, ZoneSpec};

/// Errors raised while building or querying a schema.
///
/// These are the programmer/structural tier: a malformed schema or an unknown
/// type name is a bug in the caller, not a recoverable policy failure.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Queried or referenced a type the registry does not know.
    #[error("unknown widget type `{0}`")]
    UnknownType(String),

    /// Queried a zone the type does not declare or inherit.
    #[error("type `{widget_type}` has no zone `{zone}`")]
    UnknownZone {
        /// The type that was queried.
        widget_type: String,
        /// The missing zone name.
        zone: String,
    },

    /// Two specs share one type name.
    #[error("duplicate widget type `{0}`")]
    DuplicateType(String),

    /// A spec extends a type that is not in the registry.
    #[error("type `{widget_type}` extends unknown type `{parent}`")]
    UnknownParent {
        /// The extending type.
        widget_type: String,
        /// The missing parent name.
        parent: String,
    },

    /// The `extends` chain of this type loops back on itself.
    #[error("inheritance cycle through type `{0}`")]
    InheritanceCycle(String),

    /// Following redirect wrapper types from this type revisits a type.
    #[error("redirect cycle through type `{0}`")]
    RedirectCycle(String),

    /// A redirect names a zone its declaring type does not have.
    #[error("redirect on `{widget_type}` names unknown zone `{zone}`")]
    RedirectUnknownZone {
        /// The type declaring the redirect.
        widget_type: String,
        /// The missing zone name.
        zone: String,
    },
}

struct TypeEntry {
    spec: WidgetSpec,
    /// Ancestor chain, concrete type first, root ancestor last.
    chain: Vec<String>,
    /// Effective zones: own declarations first, then inherited ones not
    /// overridden by name, walking up the chain. Order is placement precedence.
    zones: Vec<ZoneSpec>,
}

/// Compiled widget type table. Pure lookup service; immutable once built.
pub struct SchemaRegistry {
    types: HashMap<String, TypeEntry>,
}

impl SchemaRegistry {
    /// Build a registry from widget specs, validating the whole table.
    pub fn with_types(specs: Vec<WidgetSpec>) -> Result<Self, SchemaError> {
        let mut raw: HashMap<String, WidgetSpec> = HashMap::with_capacity(specs.len());
        for spec in specs {
            if raw.contains_key(&spec.name) {
                return Err(SchemaError::DuplicateType(spec.name));
            }
            raw.insert(spec.name.clone(), spec);
        }

        let mut types = HashMap::with_capacity(raw.len());
        for (name, spec) in &raw {
            let chain = Self::compute_chain(&raw, name)?;
            let zones = Self::compute_zones(&raw, &chain);
            types.insert(
                name.clone(),
                TypeEntry {
                    spec: spec.clone(),
                    chain,
                    zones,
                },
            );
        }

        let registry = Self { types };
        registry.validate_redirects()?;
        Ok(registry)
    }

    fn compute_chain(
        raw: &HashMap<String, WidgetSpec>,
        name: &str,
    ) -> Result<Vec<String>, SchemaError> {
        let mut chain = vec![name.to_owned()];
        let mut current = name;
        while let Some(parent) = raw
            .get(current)
            .and_then(|spec| spec.extends.as_deref())
        {
            if chain.iter().any(|t| t == parent) {
                return Err(SchemaError::InheritanceCycle(name.to_owned()));
            }
            if !raw.contains_key(parent) {
                return Err(SchemaError::UnknownParent {
                    widget_type: current.to_owned(),
                    parent: parent.to_owned(),
                });
            }
            chain.push(parent.to_owned());
            current = parent;
        }
        Ok(chain)
    }

    fn compute_zones(raw: &HashMap<String, WidgetSpec>, chain: &[String]) -> Vec<ZoneSpec> {
        let mut zones: Vec<ZoneSpec> = Vec::new();
        for ty in chain {
            if let Some(spec) = raw.get(ty) {
                for zone in &spec.zones {
                    if !zones.iter().any(|z| z.name == zone.name) {
                        zones.push(zone.clone());
                    }
                }
            }
        }
        zones
    }

    /// Redirect rules must reference known zones and types, and following
    /// wrapper types must terminate. The original design-tool this models
    /// recursed unboundedly on a cyclic schema; we reject it up front.
    fn validate_redirects(&self) -> Result<(), SchemaError> {
        for (name, entry) in &self.types {
            let Some(redirect) = &entry.spec.redirect else {
                continue;
            };
            if !entry.zones.iter().any(|z| z.name == redirect.zone) {
                return Err(SchemaError::RedirectUnknownZone {
                    widget_type: name.clone(),
                    zone: redirect.zone.clone(),
                });
            }
            let mut visited = vec![name.clone()];
            let mut current = redirect.widget_type.clone();
            loop {
                let entry = self
                    .types
                    .get(&current)
                    .ok_or_else(|| SchemaError::UnknownType(current.clone()))?;
                if visited.contains(&current) {
                    return Err(SchemaError::RedirectCycle(current));
                }
                visited.push(current.clone());
                match &entry.spec.redirect {
                    Some(next) => current = next.widget_type.clone(),
                    None => break,
                }
            }
        }
        Ok(())
    }

    fn entry(&self, widget_type: &str) -> Result<&TypeEntry, SchemaError> {
        self.types
            .get(widget_type)
            .ok_or_else(|| SchemaError::UnknownType(widget_type.to_owned()))
    }

    /// Whether the registry knows this type.
    pub fn contains(&self, widget_type: &str) -> bool {
        self.types.contains_key(widget_type)
    }

    /// The spec as registered.
    pub fn spec(&self, widget_type: &str) -> Result<&WidgetSpec, SchemaError> {
        Ok(&self.entry(widget_type)?.spec)
    }

    /// Ancestor chain, concrete type first, root ancestor last.
    pub fn type_chain(&self, widget_type: &str) -> Result<&[String], SchemaError> {
        Ok(&self.entry(widget_type)?.chain)
    }

    /// Whether `widget_type`'s chain contains `ancestor` (a type is its own
    /// ancestor for this purpose).
    pub fn is_type(&self, widget_type: &str, ancestor: &str) -> Result<bool, SchemaError> {
        Ok(self.entry(widget_type)?.chain.iter().any(|t| t == ancestor))
    }

    /// Whether instances of this type may become the selection.
    pub fn selectable(&self, widget_type: &str) -> Result<bool, SchemaError> {
        Ok(self.entry(widget_type)?.spec.selectable)
    }

    /// Effective zone names in placement precedence order.
    pub fn zones_of(&self, widget_type: &str) -> Result<Vec<&str>, SchemaError> {
        Ok(self
            .entry(widget_type)?
            .zones
            .iter()
            .map(|z| z.name.as_str())
            .collect())
    }

    /// The effective zone spec for a zone name.
    pub fn zone_spec(&self, widget_type: &str, zone: &str) -> Result<&ZoneSpec, SchemaError> {
        self.entry(widget_type)?
            .zones
            .iter()
            .find(|z| z.name == zone)
            .ok_or_else(|| SchemaError::UnknownZone {
                widget_type: widget_type.to_owned(),
                zone: zone.to_owned(),
            })
    }

    /// Occupancy limit of a zone.
    pub fn cardinality_of(
        &self,
        widget_type: &str,
        zone: &str,
    ) -> Result<Cardinality, SchemaError> {
        Ok(self.zone_spec(widget_type, zone)?.cardinality)
    }

    /// Whether the child type accepts this parent type, per the child's own
    /// `allowed_in`/`denied_in` lists (matched against the parent's chain).
    pub fn child_allows_parent(&self, parent: &str, child: &str) -> Result<bool, SchemaError> {
        let parent_chain = &self.entry(parent)?.chain;
        let child_spec = &self.entry(child)?.spec;
        if Self::matches_filter(&child_spec.denied_in, parent_chain) {
            return Ok(false);
        }
        if !child_spec.allowed_in.is_empty()
            && !Self::matches_filter(&child_spec.allowed_in, parent_chain)
        {
            return Ok(false);
        }
        Ok(true)
    }

    /// Whether a zone's own `allow`/`deny` lists accept the child type
    /// (matched against the child's chain). Independent of
    /// [`child_allows_parent`](Self::child_allows_parent); both must pass for
    /// a placement to be legal.
    pub fn zone_allows_child(
        &self,
        parent: &str,
        zone: &str,
        child: &str,
    ) -> Result<bool, SchemaError> {
        let zone = self.zone_spec(parent, zone)?;
        let child_chain = &self.entry(child)?.chain;
        if Self::matches_filter(&zone.deny, child_chain) {
            return Ok(false);
        }
        if !zone.allow.is_empty() && !Self::matches_filter(&zone.allow, child_chain) {
            return Ok(false);
        }
        Ok(true)
    }

    /// Zones of `parent` that would accept `child`, in precedence order,
    /// honoring both the zone filters and the child's parent filters.
    pub fn zones_for_child(&self, parent: &str, child: &str) -> Result<Vec<String>, SchemaError> {
        if !self.child_allows_parent(parent, child)? {
            return Ok(Vec::new());
        }
        let zones = self.zones_of(parent)?;
        let mut viable = Vec::new();
        for zone in zones {
            if self.zone_allows_child(parent, zone, child)? {
                viable.push(zone.to_owned());
            }
        }
        Ok(viable)
    }

    /// The redirect rule for this type, if any (inherited along the chain).
    pub fn redirect_of(&self, widget_type: &str) -> Result<Option<&Redirect>, SchemaError> {
        let entry = self.entry(widget_type)?;
        for ty in &entry.chain {
            if let Some(redirect) = &self.entry(ty)?.spec.redirect {
                return Ok(Some(redirect));
            }
        }
        Ok(None)
    }

    /// The property declaration for `name`, walking the chain from the
    /// concrete type up; a subtype declaration shadows its ancestor's.
    pub fn property_spec(
        &self,
        widget_type: &str,
        name: &str,
    ) -> Result<Option<&PropertySpec>, SchemaError> {
        let entry = self.entry(widget_type)?;
        for ty in &entry.chain {
            if let Some(spec) = self.entry(ty)?.spec.find_property(name) {
                return Ok(Some(spec));
            }
        }
        Ok(None)
    }

    /// Whether the type declares or inherits the property.
    pub fn has_property(&self, widget_type: &str, name: &str) -> Result<bool, SchemaError> {
        Ok(self.property_spec(widget_type, name)?.is_some())
    }

    /// All property names the type carries, base declarations first.
    pub fn property_names(&self, widget_type: &str) -> Result<Vec<&str>, SchemaError> {
        let entry = self.entry(widget_type)?;
        let mut names: Vec<&str> = Vec::new();
        for ty in entry.chain.iter().rev() {
            for (name, _) in &self.entry(ty)?.spec.properties {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    /// Schema default for a property, if declared.
    pub fn property_default(
        &self,
        widget_type: &str,
        name: &str,
    ) -> Result<Option<&crate::value::PropertyValue>, SchemaError> {
        Ok(self
            .property_spec(widget_type, name)?
            .and_then(|spec| spec.default.as_ref()))
    }

    /// Option list for an options property. Empty for other kinds.
    pub fn property_options(
        &self,
        widget_type: &str,
        name: &str,
    ) -> Result<&[String], SchemaError> {
        Ok(self
            .property_spec(widget_type, name)?
            .map(|spec| spec.options.as_slice())
            .unwrap_or(&[]))
    }

    /// Auto-generation prefix for a property, if declared.
    pub fn auto_prefix_of(
        &self,
        widget_type: &str,
        name: &str,
    ) -> Result<Option<&str>, SchemaError> {
        Ok(self
            .property_spec(widget_type, name)?
            .and_then(|spec| spec.auto_prefix.as_deref()))
    }

    fn matches_filter(filter: &[String], chain: &[String]) -> bool {
        filter.iter().any(|t| chain.contains(t))
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("SchemaRegistry").field("types", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::spec::PropertySpec;

    fn fixture() -> SchemaRegistry {
        SchemaRegistry::with_types(vec![
            WidgetSpec::new("Widget"),
            WidgetSpec::new("Container")
                .extends("Widget")
                .zone(ZoneSpec::new("children").deny(["Page"]))
                .property("spacing", PropertySpec::number(0.0)),
            WidgetSpec::new("Panel")
                .extends("Container")
                .property("spacing", PropertySpec::number(1.0)),
            WidgetSpec::new("Page")
                .extends("Widget")
                .zone(
                    ZoneSpec::new("header")
                        .cardinality(Cardinality::One)
                        .allow(["Header"]),
                )
                .zone(ZoneSpec::new("content").deny(["Page"])),
            WidgetSpec::new("Header").extends("Widget").allowed_in(["Page"]),
            WidgetSpec::new("Button").extends("Widget"),
            WidgetSpec::new("TabSet")
                .extends("Widget")
                .zone(ZoneSpec::new("tabs").allow(["Tab"]))
                .redirect("tabs", "Tab"),
            WidgetSpec::new("Tab")
                .extends("Widget")
                .allowed_in(["TabSet"])
                .zone(ZoneSpec::new("content").deny(["Tab"])),
        ])
        .unwrap()
    }

    #[test]
    fn chain_is_concrete_first() {
        let registry = fixture();
        assert_eq!(
            registry.type_chain("Panel").unwrap(),
            &["Panel", "Container", "Widget"]
        );
        assert_eq!(registry.type_chain("Widget").unwrap(), &["Widget"]);
    }

    #[test]
    fn is_type_membership() {
        let registry = fixture();
        assert!(registry.is_type("Panel", "Container").unwrap());
        assert!(registry.is_type("Panel", "Panel").unwrap());
        assert!(!registry.is_type("Container", "Panel").unwrap());
    }

    #[test]
    fn unknown_type_errors() {
        let registry = fixture();
        assert!(matches!(
            registry.type_chain("Ghost"),
            Err(SchemaError::UnknownType(_))
        ));
        assert!(matches!(
            registry.zone_spec("Button", "children"),
            Err(SchemaError::UnknownZone { .. })
        ));
    }

    #[test]
    fn zones_inherit_from_ancestors() {
        let registry = fixture();
        // Panel declares no zones but inherits Container's.
        assert_eq!(registry.zones_of("Panel").unwrap(), vec!["children"]);
        assert_eq!(registry.zones_of("Page").unwrap(), vec!["header", "content"]);
    }

    #[test]
    fn zone_allows_child_filters() {
        let registry = fixture();
        assert!(registry.zone_allows_child("Page", "header", "Header").unwrap());
        assert!(!registry.zone_allows_child("Page", "header", "Button").unwrap());
        // deny beats the empty allow list.
        assert!(!registry.zone_allows_child("Page", "content", "Page").unwrap());
        assert!(registry.zone_allows_child("Page", "content", "Button").unwrap());
    }

    #[test]
    fn zone_filters_match_subtypes() {
        let registry = fixture();
        // Container.children denies Page; allows Panel via the empty allow list.
        assert!(registry.zone_allows_child("Container", "children", "Panel").unwrap());
        assert!(!registry.zone_allows_child("Container", "children", "Page").unwrap());
    }

    #[test]
    fn child_allows_parent_is_independent() {
        let registry = fixture();
        // Header only goes in a Page, even though Container.children would take it.
        assert!(registry.child_allows_parent("Page", "Header").unwrap());
        assert!(!registry.child_allows_parent("Container", "Header").unwrap());
        assert!(registry.zone_allows_child("Container", "children", "Header").unwrap());
        assert!(registry
            .zones_for_child("Container", "Header")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn zones_for_child_precedence_order() {
        let registry = fixture();
        // Header fits only the header zone; Button fits only content.
        assert_eq!(
            registry.zones_for_child("Page", "Header").unwrap(),
            vec!["header"]
        );
        assert_eq!(
            registry.zones_for_child("Page", "Button").unwrap(),
            vec!["content"]
        );
    }

    #[test]
    fn redirect_lookup() {
        let registry = fixture();
        let redirect = registry.redirect_of("TabSet").unwrap().unwrap();
        assert_eq!(redirect.zone, "tabs");
        assert_eq!(redirect.widget_type, "Tab");
        assert!(registry.redirect_of("Button").unwrap().is_none());
    }

    #[test]
    fn property_lookup_walks_chain() {
        let registry = fixture();
        // Panel overrides Container's spacing default.
        let spec = registry.property_spec("Panel", "spacing").unwrap().unwrap();
        assert_eq!(spec.default, Some(crate::value::PropertyValue::Number(1.0)));
        let spec = registry.property_spec("Container", "spacing").unwrap().unwrap();
        assert_eq!(spec.default, Some(crate::value::PropertyValue::Number(0.0)));
        assert!(registry.property_spec("Panel", "ghost").unwrap().is_none());
    }

    #[test]
    fn property_names_base_first() {
        let registry = fixture();
        assert_eq!(registry.property_names("Panel").unwrap(), vec!["spacing"]);
        assert!(registry.property_names("Widget").unwrap().is_empty());
    }

    #[test]
    fn duplicate_type_rejected() {
        let err = SchemaRegistry::with_types(vec![
            WidgetSpec::new("Widget"),
            WidgetSpec::new("Widget"),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateType(_)));
    }

    #[test]
    fn unknown_parent_rejected() {
        let err = SchemaRegistry::with_types(vec![WidgetSpec::new("A").extends("Missing")])
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownParent { .. }));
    }

    #[test]
    fn inheritance_cycle_rejected() {
        let err = SchemaRegistry::with_types(vec![
            WidgetSpec::new("A").extends("B"),
            WidgetSpec::new("B").extends("A"),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::InheritanceCycle(_)));
    }

    #[test]
    fn redirect_cycle_rejected() {
        let err = SchemaRegistry::with_types(vec![
            WidgetSpec::new("A")
                .zone(ZoneSpec::new("slot"))
                .redirect("slot", "B"),
            WidgetSpec::new("B")
                .zone(ZoneSpec::new("slot"))
                .redirect("slot", "A"),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::RedirectCycle(_)));
    }

    #[test]
    fn redirect_unknown_zone_rejected() {
        let err = SchemaRegistry::with_types(vec![
            WidgetSpec::new("Tab"),
            WidgetSpec::new("A").redirect("missing", "Tab"),
        ])
        .unwrap_err();
        assert!(matches!(err, SchemaError::RedirectUnknownZone { .. }));
    }
}
