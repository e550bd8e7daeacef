//! Widget type schema: immutable descriptors, compiled registry, built-in catalog.

pub mod catalog;
pub mod registry;
pub mod spec;

pub use catalog::{builtin, DESIGN_TYPE, PAGE_TYPE};
pub use registry::{SchemaError, SchemaRegistry};
pub use spec::{Cardinality, PropertyHook, PropertyKind, PropertySpec, Redirect, WidgetSpec, ZoneSpec};
