use super::*;
use crate::containers::HashMap;

#[derive(Clone, Debug)]
pub(crate) struct Layer {
    pub(crate) parent: NodeId,
    pub(crate) children: Vec<NodeId>,
    pub(crate) resources: Vec<ResourceId>,
    pub(crate) deleted: bool,
}

impl Solution {
    pub fn layer_parent(&self, layer: LayerId) -> NodeId {
        self.layers[layer].parent
    }

    pub fn layer_children(&self, layer: LayerId) -> &[NodeId] {
        &self.layers[layer].children
    }

    pub fn layer_resources(&self, layer: LayerId) -> &[ResourceId] {
        &self.layers[layer].resources
    }

    /// The total duration of the child nodes of `layer`.
    pub fn layer_duration(&self, layer: LayerId) -> usize {
        self.layers[layer]
            .children
            .iter()
            .map(|&child| self.node_duration(child))
            .sum()
    }

    pub fn layer_make(&mut self, parent: NodeId) -> LayerId {
        let layer = self.layers.push(Layer {
            parent,
            children: vec![],
            resources: vec![],
            deleted: false,
        });
        self.nodes[parent].child_layers.push(layer);
        layer
    }

    pub fn layer_delete(&mut self, layer: LayerId) {
        if self.layers[layer].deleted {
            return;
        }
        let children = std::mem::take(&mut self.layers[layer].children);
        for child in children {
            self.nodes[child].parent_layers.retain(|&other| other != layer);
        }
        let parent = self.layers[layer].parent;
        self.nodes[parent].child_layers.retain(|&other| other != layer);
        self.layers[layer].deleted = true;
    }

    /// Adds `child` to `layer`; declines unless `child` is a child of the parent of `layer`.
    pub fn layer_add_child_node(&mut self, layer: LayerId, child: NodeId) -> bool {
        let state = &self.layers[layer];
        if state.deleted
            || self.nodes[child].parent != Some(state.parent)
            || state.children.contains(&child)
        {
            return false;
        }
        self.layers[layer].children.push(child);
        self.nodes[child].parent_layers.push(layer);
        true
    }

    pub fn layer_delete_child_node(&mut self, layer: LayerId, child: NodeId) -> bool {
        let children = &mut self.layers[layer].children;
        let Some(position) = children.iter().position(|&other| other == child) else {
            return false;
        };
        let _ = children.remove(position);
        self.nodes[child].parent_layers.retain(|&other| other != layer);
        true
    }

    pub fn layer_add_resource(&mut self, layer: LayerId, resource: ResourceId) {
        if !self.layers[layer].resources.contains(&resource) {
            self.layers[layer].resources.push(resource);
        }
    }

    /// Whether some resource preassigned to a task of a meet of `node`, or of a node below it,
    /// is `resource`.
    fn node_uses_preassigned_resource(&self, node: NodeId, resource: ResourceId) -> bool {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            let uses = self.nodes[current].meets.iter().any(|&meet| {
                self.meets[meet].tasks.iter().any(|&task| {
                    self.tasks[task].event_resource.is_some_and(|event_resource| {
                        self.instance.event_resource(event_resource).preassigned == Some(resource)
                    })
                })
            });
            if uses {
                return true;
            }
            stack.extend(self.nodes[current].children.iter().copied());
        }
        false
    }

    /// Replaces the child layers of `parent` by one layer per preassigned resource, holding the
    /// child nodes which use that resource. Layers with the same children are made once, with
    /// all their resources; layers are ordered by decreasing duration.
    pub fn node_child_layers_make(&mut self, parent: NodeId) {
        self.node_child_layers_delete(parent);

        let children = self.nodes[parent].children.clone();
        let mut by_children: HashMap<Vec<NodeId>, Vec<ResourceId>> = HashMap::default();
        let mut order = vec![];
        for resource in self.instance.resources() {
            if self.instance.preassignments(resource).is_empty() {
                continue;
            }
            let members = children
                .iter()
                .copied()
                .filter(|&child| self.node_uses_preassigned_resource(child, resource))
                .collect::<Vec<_>>();
            if members.is_empty() {
                continue;
            }
            let entry = by_children.entry(members.clone()).or_default();
            if entry.is_empty() {
                order.push(members);
            }
            entry.push(resource);
        }

        for members in order {
            let layer = self.layer_make(parent);
            for &child in members.iter() {
                let _ = self.layer_add_child_node(layer, child);
            }
            for &resource in by_children[&members].iter() {
                self.layer_add_resource(layer, resource);
            }
        }
        self.node_child_layers_sort(parent);
    }

    pub fn node_child_layers_delete(&mut self, parent: NodeId) {
        while let Some(&layer) = self.nodes[parent].child_layers.last() {
            self.layer_delete(layer);
        }
    }

    fn node_child_layers_sort(&mut self, parent: NodeId) {
        let mut layers = std::mem::take(&mut self.nodes[parent].child_layers);
        layers.sort_by_key(|&layer| (std::cmp::Reverse(self.layer_duration(layer)), layer));
        self.nodes[parent].child_layers = layers;
    }

    /// Merges every child layer of `parent` whose children are a subset of the children of
    /// another child layer into that layer, keeping its resources.
    pub fn node_child_layers_coordinate(&mut self, parent: NodeId) {
        let mut index = 0;
        while index < self.nodes[parent].child_layers.len() {
            let layer = self.nodes[parent].child_layers[index];
            let absorber = self.nodes[parent].child_layers.iter().copied().find(|&other| {
                other != layer
                    && self.layers[layer]
                        .children
                        .iter()
                        .all(|child| self.layers[other].children.contains(child))
                    && (self.layers[layer].children.len() < self.layers[other].children.len()
                        || other < layer)
            });
            match absorber {
                Some(other) => {
                    let resources = self.layers[layer].resources.clone();
                    for resource in resources {
                        self.layer_add_resource(other, resource);
                    }
                    self.layer_delete(layer);
                }
                None => index += 1,
            }
        }
        self.node_child_layers_sort(parent);
    }
}

#[cfg(test)]
mod tests {
    use crate::test_instances;

    #[test]
    fn coordination_merges_contained_layers() {
        let mut solution = test_instances::two_teacher_solution();
        let parent = solution.node_make();
        let a = solution.node_make();
        let b = solution.node_make();
        assert!(solution.node_add_parent(a, parent));
        assert!(solution.node_add_parent(b, parent));

        let big = solution.layer_make(parent);
        assert!(solution.layer_add_child_node(big, a));
        assert!(solution.layer_add_child_node(big, b));
        let small = solution.layer_make(parent);
        assert!(solution.layer_add_child_node(small, b));
        solution.layer_add_resource(small, crate::instance::ResourceId(1));

        solution.node_child_layers_coordinate(parent);

        assert_eq!(solution.node_child_layers(parent), &[big]);
        assert_eq!(solution.layer_resources(big), &[crate::instance::ResourceId(1)]);
        assert_eq!(solution.node_parent_layers(b), &[big]);
    }

    #[test]
    fn only_children_of_the_parent_join_a_layer() {
        let mut solution = test_instances::two_teacher_solution();
        let parent = solution.node_make();
        let stranger = solution.node_make();
        let layer = solution.layer_make(parent);

        assert!(!solution.layer_add_child_node(layer, stranger));
    }
}
