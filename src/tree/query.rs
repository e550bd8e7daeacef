//! Read-only tree queries: reachability, traversal, uid lookup.

use super::model::DesignModel;
use super::node::NodeId;

impl DesignModel {
    /// The topmost ancestor reachable from `node` by parent links.
    ///
    /// For an attached node this is the Design root; for a detached subtree
    /// it is the subtree's own root. Stale ids return `None`.
    pub fn root_of(&self, node: NodeId) -> Option<NodeId> {
        if !self.contains(node) {
            return None;
        }
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        Some(current)
    }

    /// Whether the node is reachable from this model's Design root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.root_of(node) == Some(self.design())
    }

    /// Whether `node` lies inside the subtree rooted at `ancestor`
    /// (a node counts as inside its own subtree).
    pub fn is_descendant_or_self(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Ancestors of `node`, nearest first, up to and including the root of
    /// its tree. Empty for detached roots and stale ids.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.parent(node);
        while let Some(id) = current {
            chain.push(id);
            current = self.parent(id);
        }
        chain
    }

    /// The nearest Page at or above `node`, if any.
    pub(crate) fn enclosing_page(&self, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            let ty = self.nodes.get(id)?.widget_type();
            if self.schema.is_type(ty, crate::schema::PAGE_TYPE).unwrap_or(false) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    /// Pre-order traversal of the subtree rooted at `start`: the node itself,
    /// then each zone in schema precedence order, each zone's children in
    /// index order, depth first.
    pub fn walk(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk_into(start, &mut out);
        out
    }

    fn walk_into(&self, node: NodeId, out: &mut Vec<NodeId>) {
        if !self.contains(node) {
            return;
        }
        out.push(node);
        let Ok(zones) = self.zones(node) else {
            return;
        };
        let zones: Vec<String> = zones.into_iter().map(str::to_owned).collect();
        for zone in zones {
            for &child in self.children(node, &zone) {
                self.walk_into(child, out);
            }
        }
    }

    /// Visit every node of the subtree in pre-order.
    pub fn for_each(&self, start: NodeId, mut visit: impl FnMut(NodeId)) {
        for node in self.walk(start) {
            visit(node);
        }
    }

    /// Find an attached node by its uid. Linear in the tree size.
    pub fn find_by_uid(&self, uid: u64) -> Option<NodeId> {
        self.walk(self.design())
            .into_iter()
            .find(|&node| self.nodes.get(node).is_some_and(|data| data.uid() == uid))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::schema::catalog;
    use crate::tree::DesignModel;

    // design ── page ── container ── button
    fn build_tree() -> (DesignModel, super::NodeId, super::NodeId, super::NodeId) {
        let mut model = DesignModel::new(Arc::new(catalog::builtin())).unwrap();
        let page = model.create_node("Page").unwrap();
        model.add_child(model.design(), page, false).unwrap();
        let container = model.create_node("Container").unwrap();
        model.add_child(page, container, false).unwrap();
        let button = model.create_node("Button").unwrap();
        model.add_child(container, button, false).unwrap();
        (model, page, container, button)
    }

    #[test]
    fn root_of_walks_to_design() {
        let (model, page, _, button) = build_tree();
        assert_eq!(model.root_of(button), Some(model.design()));
        assert_eq!(model.root_of(page), Some(model.design()));
        assert_eq!(model.root_of(model.design()), Some(model.design()));
    }

    #[test]
    fn detached_subtree_has_its_own_root() {
        let (mut model, _, _, _) = build_tree();
        let loose = model.create_node("Label").unwrap();
        assert_eq!(model.root_of(loose), Some(loose));
        assert!(!model.is_attached(loose));
    }

    #[test]
    fn is_descendant_or_self() {
        let (model, page, container, button) = build_tree();
        assert!(model.is_descendant_or_self(button, page));
        assert!(model.is_descendant_or_self(button, button));
        assert!(!model.is_descendant_or_self(page, container));
    }

    #[test]
    fn ancestors_nearest_first() {
        let (model, page, container, button) = build_tree();
        assert_eq!(
            model.ancestors(button),
            vec![container, page, model.design()]
        );
        assert!(model.ancestors(model.design()).is_empty());
    }

    #[test]
    fn walk_is_preorder() {
        let (model, page, container, button) = build_tree();
        assert_eq!(
            model.walk(model.design()),
            vec![model.design(), page, container, button]
        );
        assert_eq!(model.walk(container), vec![container, button]);
    }

    #[test]
    fn walk_respects_zone_precedence() {
        let (mut model, page, container, _) = build_tree();
        // header comes before content in Page's zone order.
        let header = model.create_node("Header").unwrap();
        model.add_child(page, header, false).unwrap();
        let walked = model.walk(page);
        let header_pos = walked.iter().position(|&n| n == header).unwrap();
        let container_pos = walked.iter().position(|&n| n == container).unwrap();
        assert!(header_pos < container_pos);
    }

    #[test]
    fn find_by_uid() {
        let (model, _, _, button) = build_tree();
        let uid = model.uid(button).unwrap();
        assert_eq!(model.find_by_uid(uid), Some(button));
        assert_eq!(model.find_by_uid(9_999), None);
    }

    #[test]
    fn find_by_uid_ignores_detached_nodes() {
        let (mut model, _, _, _) = build_tree();
        let loose = model.create_node("Label").unwrap();
        let uid = model.uid(loose).unwrap();
        assert_eq!(model.find_by_uid(uid), None);
    }
}
