#![forbid(unsafe_code)]

//! In-memory view tree and constraints for headless hosts and tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use kbshift_core::Rect;

use crate::tree::{LayoutConstraint, ViewTree};

/// Handle to a node in a [`SceneTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneView(usize);

impl SceneView {
    /// Node index.
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
struct Node {
    parent: Option<usize>,
    children: Vec<usize>,
    frame: Rect,
    accepts_input: bool,
}

#[derive(Debug)]
struct Scene {
    nodes: Vec<Node>,
    version: u64,
    resigned: u64,
}

/// A mutable view tree whose root sits at a fixed screen frame.
#[derive(Debug)]
pub struct SceneTree {
    inner: Mutex<Scene>,
}

impl SceneTree {
    /// Create a tree whose root occupies `screen_frame`.
    pub fn new(screen_frame: Rect) -> Self {
        Self {
            inner: Mutex::new(Scene {
                nodes: vec![Node {
                    parent: None,
                    children: Vec::new(),
                    frame: screen_frame,
                    accepts_input: false,
                }],
                version: 0,
                resigned: 0,
            }),
        }
    }

    /// Append a child with `frame` in the parent's space.
    pub fn add_child(&self, parent: &SceneView, frame: Rect) -> SceneView {
        let mut scene = self.lock();
        let index = scene.nodes.len();
        scene.nodes.push(Node {
            parent: Some(parent.0),
            children: Vec::new(),
            frame,
            accepts_input: false,
        });
        scene.nodes[parent.0].children.push(index);
        scene.version += 1;
        SceneView(index)
    }

    /// Detach `view` (and its subtree) from its parent.
    pub fn detach(&self, view: &SceneView) {
        let mut scene = self.lock();
        if let Some(parent) = scene.nodes[view.0].parent.take() {
            scene.nodes[parent].children.retain(|&c| c != view.0);
            scene.version += 1;
        }
    }

    /// Make `view` the only view accepting input.
    pub fn focus(&self, view: &SceneView) {
        let mut scene = self.lock();
        for node in &mut scene.nodes {
            node.accepts_input = false;
        }
        scene.nodes[view.0].accepts_input = true;
    }

    /// Set whether `view` accepts input, leaving other views alone.
    pub fn set_accepts_input(&self, view: &SceneView, accepts: bool) {
        self.lock().nodes[view.0].accepts_input = accepts;
    }

    /// Number of `resign_input` calls so far.
    pub fn resign_count(&self) -> u64 {
        self.lock().resigned
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Scene> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ViewTree for SceneTree {
    type View = SceneView;

    fn root(&self) -> SceneView {
        SceneView(0)
    }

    fn children(&self, view: &SceneView) -> Vec<SceneView> {
        self.lock().nodes[view.0]
            .children
            .iter()
            .map(|&c| SceneView(c))
            .collect()
    }

    fn accepts_input(&self, view: &SceneView) -> bool {
        self.lock().nodes[view.0].accepts_input
    }

    fn frame(&self, view: &SceneView) -> Rect {
        self.lock().nodes[view.0].frame
    }

    fn set_frame(&self, view: &SceneView, frame: Rect) {
        self.lock().nodes[view.0].frame = frame;
    }

    fn frame_in_root(&self, view: &SceneView) -> Rect {
        let scene = self.lock();
        let mut frame = scene.nodes[view.0].frame;
        let mut cursor = scene.nodes[view.0].parent;
        while let Some(index) = cursor {
            let node = &scene.nodes[index];
            if node.parent.is_none() {
                break;
            }
            frame = frame.offset(node.frame.x, node.frame.y);
            cursor = node.parent;
        }
        frame
    }

    fn convert_from_screen(&self, rect: Rect) -> Rect {
        let origin = self.lock().nodes[0].frame;
        rect.offset(-origin.x, -origin.y)
    }

    fn resign_input(&self, view: &SceneView) {
        let mut scene = self.lock();
        scene.nodes[view.0].accepts_input = false;
        scene.resigned += 1;
    }

    fn structure_version(&self) -> u64 {
        self.lock().version
    }
}

/// A constraint constant shared between the host and the synchronizer.
#[derive(Debug, Clone, Default)]
pub struct SharedConstraint {
    bits: Arc<AtomicU64>,
}

impl SharedConstraint {
    /// Create a constraint with `value`.
    pub fn new(value: f64) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(value.to_bits())),
        }
    }
}

impl LayoutConstraint for SharedConstraint {
    fn constant(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    fn set_constant(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_in_root_accumulates_ancestors_below_root() {
        let scene = SceneTree::new(Rect::new(0.0, 20.0, 400.0, 800.0));
        let root = scene.root();
        let panel = scene.add_child(&root, Rect::new(10.0, 100.0, 300.0, 400.0));
        let field = scene.add_child(&panel, Rect::new(5.0, 50.0, 200.0, 40.0));

        assert_eq!(scene.frame_in_root(&field), Rect::new(15.0, 150.0, 200.0, 40.0));
        assert_eq!(scene.frame_in_root(&panel), Rect::new(10.0, 100.0, 300.0, 400.0));
    }

    #[test]
    fn screen_conversion_subtracts_root_origin() {
        let scene = SceneTree::new(Rect::new(0.0, 20.0, 400.0, 800.0));
        assert_eq!(
            scene.convert_from_screen(Rect::new(0.0, 520.0, 400.0, 300.0)),
            Rect::new(0.0, 500.0, 400.0, 300.0)
        );
    }

    #[test]
    fn structure_version_tracks_mutations() {
        let scene = SceneTree::new(Rect::from_size(400.0, 800.0));
        let root = scene.root();
        let v0 = scene.structure_version();
        let child = scene.add_child(&root, Rect::ZERO);
        scene.detach(&child);
        assert_eq!(scene.structure_version(), v0 + 2);
        assert!(scene.children(&root).is_empty());
    }

    #[test]
    fn focus_is_exclusive_and_resign_clears_it() {
        let scene = SceneTree::new(Rect::from_size(400.0, 800.0));
        let root = scene.root();
        let a = scene.add_child(&root, Rect::ZERO);
        let b = scene.add_child(&root, Rect::ZERO);
        scene.focus(&a);
        scene.focus(&b);
        assert!(!scene.accepts_input(&a));
        scene.resign_input(&b);
        assert!(!scene.accepts_input(&b));
        assert_eq!(scene.resign_count(), 1);
    }

    #[test]
    fn shared_constraint_is_shared() {
        let c = SharedConstraint::new(20.0);
        let alias = c.clone();
        alias.set_constant(310.0);
        assert_eq!(c.constant(), 310.0);
    }
}
