//! Widget type descriptors: zones, cardinality, properties, redirects.
//!
//! Everything in this module is immutable configuration. A [`WidgetSpec`] is
//! built once (builder-style) and handed to the
//! [`SchemaRegistry`](super::SchemaRegistry), which never mutates it.

use crate::value::PropertyValue;

// ---------------------------------------------------------------------------
// Cardinality
// ---------------------------------------------------------------------------

/// How many children a zone may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one occupant at most.
    One,
    /// A fixed upper bound.
    Exactly(u32),
    /// No limit (`"N"`).
    Unbounded,
}

impl Cardinality {
    /// Whether a zone currently holding `occupants` children has room for one more.
    pub fn has_room(&self, occupants: usize) -> bool {
        match self {
            Self::One => occupants < 1,
            Self::Exactly(n) => occupants < *n as usize,
            Self::Unbounded => true,
        }
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::One => write!(f, "1"),
            Self::Exactly(n) => write!(f, "{n}"),
            Self::Unbounded => write!(f, "N"),
        }
    }
}

// ---------------------------------------------------------------------------
// ZoneSpec
// ---------------------------------------------------------------------------

/// A named child slot on a widget type.
///
/// `allow` and `deny` filter candidate child types. A name in either list
/// matches any type whose ancestor chain contains it. An empty `allow` list
/// means "any type not denied".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSpec {
    /// Zone name, unique within the declaring type.
    pub name: String,
    /// Occupancy limit.
    pub cardinality: Cardinality,
    /// If non-empty, only these types (or their subtypes) are accepted.
    pub allow: Vec<String>,
    /// These types (and their subtypes) are always rejected.
    pub deny: Vec<String>,
}

impl ZoneSpec {
    /// Create an unbounded zone with no type filters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cardinality: Cardinality::Unbounded,
            allow: Vec::new(),
            deny: Vec::new(),
        }
    }

    /// Set the cardinality (builder).
    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Restrict the zone to the given types and their subtypes (builder).
    pub fn allow(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allow.extend(types.into_iter().map(Into::into));
        self
    }

    /// Reject the given types and their subtypes (builder).
    pub fn deny(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.deny.extend(types.into_iter().map(Into::into));
        self
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// The declared kind of a property.
///
/// `Integer`, `Float`, and `Number` form one numeric family: a property
/// declared as any of them accepts any numeric [`PropertyValue`], plus a
/// string that parses as a number. A schema default of `0` therefore never
/// fails a strict check against a declared `Integer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// Free-form text.
    String,
    /// Numeric family.
    Integer,
    /// Numeric family.
    Float,
    /// Numeric family.
    Number,
    /// Boolean flag.
    Bool,
    /// One string out of a fixed option list.
    Options,
}

impl PropertyKind {
    /// Whether this kind belongs to the numeric coercion family.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Number)
    }

    /// Human-readable kind name for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer | Self::Float | Self::Number => "a number",
            Self::Bool => "a boolean",
            Self::Options => "one of the declared options",
        }
    }
}

/// Signature of a property hook.
///
/// Invoked with the value being applied (`None` when a set is being undone to
/// the unset state) and, during undo/redo replay, the opaque data the previous
/// invocation returned. The returned data is stored on the transaction record
/// and handed back verbatim on the next replay.
pub type PropertyHook =
    fn(value: Option<&PropertyValue>, replay: Option<&PropertyValue>) -> Option<PropertyValue>;

/// A typed property declaration on a widget type.
#[derive(Clone)]
pub struct PropertySpec {
    /// Declared kind.
    pub kind: PropertyKind,
    /// Value reported when the property was never explicitly set and no
    /// auto-generation prefix applies.
    pub default: Option<PropertyValue>,
    /// Option list for [`PropertyKind::Options`] properties.
    pub options: Vec<String>,
    /// If set, unset reads auto-generate `"{prefix}{suffix}"` with a
    /// tree-wide unique numeric suffix.
    pub auto_prefix: Option<String>,
    /// Optional hook run on every explicit set and on undo/redo replay.
    pub hook: Option<PropertyHook>,
}

impl PropertySpec {
    /// A string property with a default.
    pub fn string(default: impl Into<String>) -> Self {
        Self {
            kind: PropertyKind::String,
            default: Some(PropertyValue::String(default.into())),
            options: Vec::new(),
            auto_prefix: None,
            hook: None,
        }
    }

    /// An integer property with a default.
    pub fn integer(default: i64) -> Self {
        Self {
            kind: PropertyKind::Integer,
            default: Some(PropertyValue::Integer(default)),
            options: Vec::new(),
            auto_prefix: None,
            hook: None,
        }
    }

    /// A float/number property with a default.
    pub fn number(default: f64) -> Self {
        Self {
            kind: PropertyKind::Number,
            default: Some(PropertyValue::Number(default)),
            options: Vec::new(),
            auto_prefix: None,
            hook: None,
        }
    }

    /// A boolean property with a default.
    pub fn bool(default: bool) -> Self {
        Self {
            kind: PropertyKind::Bool,
            default: Some(PropertyValue::Bool(default)),
            options: Vec::new(),
            auto_prefix: None,
            hook: None,
        }
    }

    /// An options property; `default` should be one of `options`.
    pub fn options(
        options: impl IntoIterator<Item = impl Into<String>>,
        default: impl Into<String>,
    ) -> Self {
        Self {
            kind: PropertyKind::Options,
            default: Some(PropertyValue::String(default.into())),
            options: options.into_iter().map(Into::into).collect(),
            auto_prefix: None,
            hook: None,
        }
    }

    /// An auto-generated string property with the given prefix (builder base).
    pub fn auto(prefix: impl Into<String>) -> Self {
        Self {
            kind: PropertyKind::String,
            default: None,
            options: Vec::new(),
            auto_prefix: Some(prefix.into()),
            hook: None,
        }
    }

    /// Attach a hook (builder).
    pub fn with_hook(mut self, hook: PropertyHook) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Check `value` against this declaration, returning the value to store.
    ///
    /// Numeric kinds coerce a parseable string into its numeric value; the
    /// coerced form is what gets stored. `None` means the value is rejected.
    pub fn check(&self, value: &PropertyValue) -> Option<PropertyValue> {
        match self.kind {
            PropertyKind::String => value.as_str().map(|_| value.clone()),
            PropertyKind::Bool => value.as_bool().map(PropertyValue::Bool),
            PropertyKind::Integer | PropertyKind::Float | PropertyKind::Number => {
                match value {
                    PropertyValue::Integer(_) | PropertyValue::Number(_) => Some(value.clone()),
                    PropertyValue::String(s) => {
                        s.trim().parse::<f64>().ok().map(PropertyValue::Number)
                    }
                    PropertyValue::Bool(_) => None,
                }
            }
            PropertyKind::Options => value
                .as_str()
                .filter(|s| self.options.iter().any(|o| o == s))
                .map(|_| value.clone()),
        }
    }
}

impl std::fmt::Debug for PropertySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertySpec")
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("options", &self.options)
            .field("auto_prefix", &self.auto_prefix)
            .field("hook", &self.hook.map(|_| "fn"))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Redirect
// ---------------------------------------------------------------------------

/// A wrapper rule: when no zone of this type accepts a child directly, the
/// model may wrap the child in a `widget_type` instance placed in `zone`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// The zone on the declaring type that hosts the wrapper.
    pub zone: String,
    /// The wrapper type.
    pub widget_type: String,
}

// ---------------------------------------------------------------------------
// WidgetSpec
// ---------------------------------------------------------------------------

/// The immutable definition of one widget type.
#[derive(Debug, Clone)]
pub struct WidgetSpec {
    /// Type name, unique within a registry.
    pub name: String,
    /// Parent type name (single inheritance). `None` only for the root type.
    pub extends: Option<String>,
    /// Whether instances may become the design selection.
    pub selectable: bool,
    /// If non-empty, instances accept only these parent types (or subtypes).
    pub allowed_in: Vec<String>,
    /// Instances reject these parent types (and subtypes).
    pub denied_in: Vec<String>,
    /// Child zones, in declaration order (which is placement precedence order).
    pub zones: Vec<ZoneSpec>,
    /// Property declarations, in declaration order.
    pub properties: Vec<(String, PropertySpec)>,
    /// Optional wrapper rule for otherwise-incompatible children.
    pub redirect: Option<Redirect>,
}

impl WidgetSpec {
    /// Create a root type with no parent, no zones, and no properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extends: None,
            selectable: true,
            allowed_in: Vec::new(),
            denied_in: Vec::new(),
            zones: Vec::new(),
            properties: Vec::new(),
            redirect: None,
        }
    }

    /// Set the parent type (builder).
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    /// Set whether instances are selectable (builder).
    pub fn selectable(mut self, selectable: bool) -> Self {
        self.selectable = selectable;
        self
    }

    /// Restrict which parent types accept instances of this type (builder).
    pub fn allowed_in(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_in.extend(types.into_iter().map(Into::into));
        self
    }

    /// Reject the given parent types (builder).
    pub fn denied_in(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.denied_in.extend(types.into_iter().map(Into::into));
        self
    }

    /// Declare a child zone (builder). Order of calls is precedence order.
    pub fn zone(mut self, zone: ZoneSpec) -> Self {
        self.zones.push(zone);
        self
    }

    /// Declare a property (builder).
    pub fn property(mut self, name: impl Into<String>, spec: PropertySpec) -> Self {
        self.properties.push((name.into(), spec));
        self
    }

    /// Declare a redirect rule (builder).
    pub fn redirect(mut self, zone: impl Into<String>, widget_type: impl Into<String>) -> Self {
        self.redirect = Some(Redirect {
            zone: zone.into(),
            widget_type: widget_type.into(),
        });
        self
    }

    /// Find a zone spec by name.
    pub fn find_zone(&self, name: &str) -> Option<&ZoneSpec> {
        self.zones.iter().find(|z| z.name == name)
    }

    /// Find a property spec declared directly on this type.
    pub fn find_property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, spec)| spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinality_has_room() {
        assert!(Cardinality::One.has_room(0));
        assert!(!Cardinality::One.has_room(1));
        assert!(Cardinality::Exactly(3).has_room(2));
        assert!(!Cardinality::Exactly(3).has_room(3));
        assert!(Cardinality::Unbounded.has_room(10_000));
    }

    #[test]
    fn cardinality_display() {
        assert_eq!(Cardinality::One.to_string(), "1");
        assert_eq!(Cardinality::Exactly(4).to_string(), "4");
        assert_eq!(Cardinality::Unbounded.to_string(), "N");
    }

    #[test]
    fn zone_builder() {
        let zone = ZoneSpec::new("tabs")
            .cardinality(Cardinality::Exactly(8))
            .allow(["Tab"])
            .deny(["Page"]);
        assert_eq!(zone.name, "tabs");
        assert_eq!(zone.cardinality, Cardinality::Exactly(8));
        assert_eq!(zone.allow, vec!["Tab"]);
        assert_eq!(zone.deny, vec!["Page"]);
    }

    #[test]
    fn string_check_rejects_number() {
        let spec = PropertySpec::string("Button");
        assert!(spec.check(&PropertyValue::Integer(42)).is_none());
        assert!(spec.check(&PropertyValue::from("ok")).is_some());
    }

    #[test]
    fn numeric_check_accepts_family() {
        let spec = PropertySpec::integer(0);
        // Integer default 0 is a plain number literal; must not be rejected.
        assert_eq!(
            spec.check(&PropertyValue::Number(0.0)),
            Some(PropertyValue::Number(0.0))
        );
        assert_eq!(
            spec.check(&PropertyValue::Integer(7)),
            Some(PropertyValue::Integer(7))
        );
    }

    #[test]
    fn numeric_check_parses_strings() {
        let spec = PropertySpec::number(0.0);
        assert_eq!(
            spec.check(&PropertyValue::from("12.5")),
            Some(PropertyValue::Number(12.5))
        );
        assert!(spec.check(&PropertyValue::from("not a number")).is_none());
        assert!(spec.check(&PropertyValue::Bool(true)).is_none());
    }

    #[test]
    fn bool_check() {
        let spec = PropertySpec::bool(false);
        assert!(spec.check(&PropertyValue::Bool(true)).is_some());
        assert!(spec.check(&PropertyValue::from("true")).is_none());
    }

    #[test]
    fn options_check_enforces_membership() {
        let spec = PropertySpec::options(["primary", "danger"], "primary");
        assert!(spec.check(&PropertyValue::from("danger")).is_some());
        assert!(spec.check(&PropertyValue::from("link")).is_none());
        assert!(spec.check(&PropertyValue::Integer(1)).is_none());
    }

    #[test]
    fn widget_spec_builder() {
        let spec = WidgetSpec::new("TabSet")
            .extends("Widget")
            .zone(ZoneSpec::new("tabs").allow(["Tab"]))
            .redirect("tabs", "Tab")
            .property("active_tab", PropertySpec::integer(0));
        assert_eq!(spec.name, "TabSet");
        assert_eq!(spec.extends.as_deref(), Some("Widget"));
        assert!(spec.find_zone("tabs").is_some());
        assert!(spec.find_zone("rows").is_none());
        assert!(spec.find_property("active_tab").is_some());
        assert_eq!(
            spec.redirect,
            Some(Redirect {
                zone: "tabs".into(),
                widget_type: "Tab".into()
            })
        );
    }
}
