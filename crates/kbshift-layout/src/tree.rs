#![forbid(unsafe_code)]

//! View-tree seam.
//!
//! The host toolkit owns its views and constraints. A synchronizer only needs
//! to walk one consumer's subtree, read and write vertical positions, and
//! ask the focused element to give up input. [`ViewTree`] and
//! [`LayoutConstraint`] are that surface.
//!
//! All methods take `&self`: hosts back them with whatever interior
//! mutability their toolkit uses, and the synchronizer may call them from
//! inside an animation batch.

use std::fmt;

use kbshift_core::Rect;

/// A consumer's view subtree as seen by the synchronizer.
pub trait ViewTree: Send + Sync {
    /// Handle to one view. Cheap to clone.
    type View: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// The consumer's root view.
    fn root(&self) -> Self::View;

    /// Direct children of `view`, front to back.
    fn children(&self, view: &Self::View) -> Vec<Self::View>;

    /// Returns `true` if `view` currently accepts text input.
    fn accepts_input(&self, view: &Self::View) -> bool;

    /// Frame of `view` in its parent's coordinate space.
    fn frame(&self, view: &Self::View) -> Rect;

    /// Replace the frame of `view`.
    fn set_frame(&self, view: &Self::View, frame: Rect);

    /// Frame of `view` in the root view's coordinate space.
    fn frame_in_root(&self, view: &Self::View) -> Rect;

    /// Convert a screen-space rectangle into the root view's space.
    fn convert_from_screen(&self, rect: Rect) -> Rect;

    /// Ask `view` to give up input focus.
    fn resign_input(&self, view: &Self::View);

    /// Counter bumped whenever views are added, removed or re-parented.
    fn structure_version(&self) -> u64;

    /// Flush pending layout so frames reflect the latest constraint values.
    fn layout_if_needed(&self) {}
}

/// A single numeric layout constraint.
pub trait LayoutConstraint: Send + Sync {
    /// Current constant.
    fn constant(&self) -> f64;

    /// Replace the constant.
    fn set_constant(&self, value: f64);
}

/// Depth-first, pre-order search for the view currently accepting input.
///
/// `start` itself is checked first.
pub fn find_active_input<T: ViewTree + ?Sized>(tree: &T, start: &T::View) -> Option<T::View> {
    let mut stack = vec![start.clone()];
    while let Some(view) = stack.pop() {
        if tree.accepts_input(&view) {
            return Some(view);
        }
        let mut children = tree.children(&view);
        children.reverse();
        stack.extend(children);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneTree;

    #[test]
    fn finds_nothing_without_focus() {
        let scene = SceneTree::new(Rect::from_size(400.0, 800.0));
        let root = scene.root();
        scene.add_child(&root, Rect::new(0.0, 0.0, 100.0, 40.0));
        assert_eq!(find_active_input(&scene, &root), None);
    }

    #[test]
    fn preorder_prefers_earlier_subtree() {
        let scene = SceneTree::new(Rect::from_size(400.0, 800.0));
        let root = scene.root();
        let left = scene.add_child(&root, Rect::new(0.0, 0.0, 200.0, 400.0));
        let deep = scene.add_child(&left, Rect::new(0.0, 10.0, 100.0, 40.0));
        let right = scene.add_child(&root, Rect::new(200.0, 0.0, 200.0, 400.0));
        scene.set_accepts_input(&deep, true);
        scene.set_accepts_input(&right, true);

        assert_eq!(find_active_input(&scene, &root), Some(deep));
    }

    #[test]
    fn search_can_start_below_root() {
        let scene = SceneTree::new(Rect::from_size(400.0, 800.0));
        let root = scene.root();
        let panel = scene.add_child(&root, Rect::new(0.0, 0.0, 400.0, 400.0));
        let outside = scene.add_child(&root, Rect::new(0.0, 400.0, 400.0, 400.0));
        scene.focus(&outside);

        assert_eq!(find_active_input(&scene, &panel), None);
        assert_eq!(find_active_input(&scene, &root), Some(outside));
    }
}
