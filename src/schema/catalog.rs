//! The built-in widget catalog.
//!
//! This is configuration, not logic: the stock set of widget types an
//! interactive designer ships with. Applications with their own widget set
//! build a [`SchemaRegistry`] from their own specs instead.

use super::registry::SchemaRegistry;
use super::spec::{Cardinality, PropertySpec, WidgetSpec, ZoneSpec};

/// Type name of the tree root.
pub const DESIGN_TYPE: &str = "Design";
/// Type name of a page.
pub const PAGE_TYPE: &str = "Page";

/// Build the built-in catalog.
///
/// The catalog always validates; a failure here is a bug in the catalog data.
pub fn builtin() -> SchemaRegistry {
    SchemaRegistry::with_types(catalog_specs()).expect("built-in catalog must be valid")
}

fn catalog_specs() -> Vec<WidgetSpec> {
    vec![
        WidgetSpec::new("Widget").property("visible", PropertySpec::bool(true)),
        WidgetSpec::new(DESIGN_TYPE)
            .extends("Widget")
            .selectable(false)
            .zone(ZoneSpec::new("pages").allow([PAGE_TYPE])),
        WidgetSpec::new(PAGE_TYPE)
            .extends("Widget")
            .allowed_in([DESIGN_TYPE])
            .zone(
                ZoneSpec::new("header")
                    .cardinality(Cardinality::One)
                    .allow(["Header"]),
            )
            .zone(ZoneSpec::new("content").deny([PAGE_TYPE, DESIGN_TYPE]))
            .property("title", PropertySpec::auto("Page")),
        WidgetSpec::new("Header")
            .extends("Widget")
            .allowed_in([PAGE_TYPE])
            .property("text", PropertySpec::string("Header")),
        WidgetSpec::new("Container")
            .extends("Widget")
            .zone(ZoneSpec::new("children").deny([PAGE_TYPE, DESIGN_TYPE]))
            .property("spacing", PropertySpec::number(0.0)),
        WidgetSpec::new("Panel")
            .extends("Container")
            .property("collapsed", PropertySpec::bool(false)),
        WidgetSpec::new("Label")
            .extends("Widget")
            .property("text", PropertySpec::string("Label")),
        WidgetSpec::new("Button")
            .extends("Widget")
            .property("id", PropertySpec::auto("button"))
            .property("text", PropertySpec::string("Button"))
            .property(
                "kind",
                PropertySpec::options(["primary", "secondary", "danger"], "primary"),
            ),
        WidgetSpec::new("Input")
            .extends("Widget")
            .property("id", PropertySpec::auto("input"))
            .property("value", PropertySpec::string(""))
            .property("max_length", PropertySpec::integer(0)),
        WidgetSpec::new("TabSet")
            .extends("Widget")
            .zone(ZoneSpec::new("tabs").allow(["Tab"]))
            .redirect("tabs", "Tab"),
        WidgetSpec::new("Tab")
            .extends("Widget")
            .allowed_in(["TabSet"])
            .zone(ZoneSpec::new("content").deny([PAGE_TYPE, DESIGN_TYPE, "Tab"]))
            .property("title", PropertySpec::auto("Tab")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_builds() {
        let registry = builtin();
        for ty in [
            DESIGN_TYPE,
            PAGE_TYPE,
            "Header",
            "Container",
            "Panel",
            "Label",
            "Button",
            "Input",
            "TabSet",
            "Tab",
        ] {
            assert!(registry.contains(ty), "catalog is missing `{ty}`");
        }
    }

    #[test]
    fn design_hosts_only_pages() {
        let registry = builtin();
        assert_eq!(
            registry.zones_for_child(DESIGN_TYPE, PAGE_TYPE).unwrap(),
            vec!["pages"]
        );
        assert!(registry
            .zones_for_child(DESIGN_TYPE, "Button")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn design_is_not_selectable() {
        let registry = builtin();
        assert!(!registry.selectable(DESIGN_TYPE).unwrap());
        assert!(registry.selectable("Button").unwrap());
    }

    #[test]
    fn tabset_redirects_to_tab() {
        let registry = builtin();
        let redirect = registry.redirect_of("TabSet").unwrap().unwrap();
        assert_eq!(redirect.widget_type, "Tab");
        // A Button cannot go into a TabSet directly...
        assert!(registry
            .zones_for_child("TabSet", "Button")
            .unwrap()
            .is_empty());
        // ...but fits a Tab's content zone.
        assert_eq!(
            registry.zones_for_child("Tab", "Button").unwrap(),
            vec!["content"]
        );
    }

    #[test]
    fn auto_generated_properties() {
        let registry = builtin();
        assert_eq!(registry.auto_prefix_of("Button", "id").unwrap(), Some("button"));
        assert_eq!(registry.auto_prefix_of(PAGE_TYPE, "title").unwrap(), Some("Page"));
        assert_eq!(registry.auto_prefix_of("Button", "text").unwrap(), None);
    }

    #[test]
    fn widget_base_property_inherited() {
        let registry = builtin();
        assert!(registry.has_property("Button", "visible").unwrap());
        assert_eq!(
            registry.property_names("Button").unwrap(),
            vec!["visible", "id", "text", "kind"]
        );
    }
}
