#![forbid(unsafe_code)]

//! Frame-based targets.
//!
//! A managed view's baseline is its vertical origin. Shifting moves the view
//! up by the overlap; restoring writes the baseline origin back while keeping
//! the view's current horizontal position and size.

use crate::baseline::OriginalValueStore;
use crate::error::Result;
use crate::target::TargetId;
use crate::tree::ViewTree;

/// One pending vertical-origin write.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginWrite<V> {
    pub(crate) view: V,
    pub(crate) y: f64,
}

impl<V> OriginWrite<V> {
    /// The view being moved.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// The vertical origin that will be written.
    pub fn y(&self) -> f64 {
        self.y
    }

    pub(crate) fn apply<T: ViewTree<View = V> + ?Sized>(&self, tree: &T) {
        let frame = tree.frame(&self.view);
        tree.set_frame(&self.view, frame.with_y(self.y));
    }
}

/// Ordered set of managed views, identified by registration index.
#[derive(Debug, Clone)]
pub struct FrameTargets<V> {
    views: Vec<V>,
}

impl<V> Default for FrameTargets<V> {
    fn default() -> Self {
        Self { views: Vec::new() }
    }
}

impl<V: Clone> FrameTargets<V> {
    /// Manage `views` in order.
    pub fn new(views: Vec<V>) -> Self {
        Self { views }
    }

    /// Number of views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Returns `true` if no view is managed.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Identifiers in registration order.
    pub fn ids(&self) -> impl Iterator<Item = TargetId> + '_ {
        (0..self.views.len()).map(TargetId::View)
    }

    /// Current vertical origin of every view.
    pub fn snapshot<T: ViewTree<View = V> + ?Sized>(&self, tree: &T) -> Vec<(TargetId, f64)> {
        self.views
            .iter()
            .enumerate()
            .map(|(index, view)| (TargetId::View(index), tree.frame(view).y))
            .collect()
    }

    /// Writes that put every view at its baseline, raised by `overlap`.
    pub fn plan(&self, store: &OriginalValueStore, overlap: Option<f64>) -> Result<Vec<OriginWrite<V>>> {
        self.views
            .iter()
            .enumerate()
            .map(|(index, view)| {
                let baseline = store.restore(&TargetId::View(index))?;
                Ok(OriginWrite {
                    view: view.clone(),
                    y: baseline - overlap.unwrap_or(0.0),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneTree;
    use kbshift_core::Rect;
    use kbshift_runtime::ConsumerId;

    #[test]
    fn plan_raises_views_and_restore_keeps_x_and_size() {
        let scene = SceneTree::new(Rect::from_size(400.0, 800.0));
        let root = scene.root();
        let form = scene.add_child(&root, Rect::new(0.0, 400.0, 400.0, 400.0));
        let targets = FrameTargets::new(vec![form]);

        let mut store = OriginalValueStore::new(ConsumerId::from_raw(1));
        store.capture(targets.snapshot(&scene)).unwrap();

        for write in targets.plan(&store, Some(120.0)).unwrap() {
            write.apply(&scene);
        }
        assert_eq!(scene.frame(&form), Rect::new(0.0, 280.0, 400.0, 400.0));

        // Host moved the view sideways and resized it meanwhile.
        scene.set_frame(&form, Rect::new(10.0, 280.0, 380.0, 300.0));
        for write in targets.plan(&store, None).unwrap() {
            write.apply(&scene);
        }
        assert_eq!(scene.frame(&form), Rect::new(10.0, 400.0, 380.0, 300.0));
    }

    #[test]
    fn ids_follow_registration_order() {
        let targets = FrameTargets::new(vec!["a", "b"]);
        assert_eq!(
            targets.ids().collect::<Vec<_>>(),
            vec![TargetId::View(0), TargetId::View(1)]
        );
    }
}
