#![forbid(unsafe_code)]

//! Interactive menu controls.
//!
//! A [`PermissionButton`] is an icon-textured quad that forwards selection to
//! a caller-supplied callback. The callback receives an [`ActivationHandle`]
//! it can use to flag the outcome; the button itself has no notion of what
//! the callback does.
//!
//! A [`ControlGrid`] owns the buttons of one menu, in insertion order, and
//! keeps their grid slots consistent with the current button count.

use core::fmt;
use std::ops::Range;
use std::rc::Rc;

use glam::Mat4;
use xrplay_core::IconSet;
use xrplay_layout::{ButtonGridLayout, GridSlot};

use crate::host::SceneNodes;

/// Callback run when a button is selected.
pub type ActivateFn = Rc<dyn Fn(ActivationHandle)>;

/// Caller-supplied definition of a button.
#[derive(Clone)]
pub struct ButtonDescriptor {
    /// Icon name or path, resolved through an [`IconSet`].
    pub icon: String,
    pub on_activate: ActivateFn,
}

impl ButtonDescriptor {
    pub fn new(icon: impl Into<String>, on_activate: impl Fn(ActivationHandle) + 'static) -> Self {
        Self {
            icon: icon.into(),
            on_activate: Rc::new(on_activate),
        }
    }
}

impl fmt::Debug for ButtonDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ButtonDescriptor")
            .field("icon", &self.icon)
            .finish_non_exhaustive()
    }
}

/// Which texture a button currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonIcon {
    /// The descriptor's own icon.
    #[default]
    Normal,
    /// Checkmark.
    Success,
    /// X mark.
    Fail,
}

/// Continuations handed to an activation callback.
#[derive(Clone)]
pub struct ActivationHandle {
    control: usize,
    mark: Rc<dyn Fn(usize, ButtonIcon)>,
}

impl ActivationHandle {
    pub fn new(control: usize, mark: impl Fn(usize, ButtonIcon) + 'static) -> Self {
        Self {
            control,
            mark: Rc::new(mark),
        }
    }

    /// Index of the activated control within its grid.
    #[must_use]
    pub fn control(&self) -> usize {
        self.control
    }

    pub fn mark_success(&self) {
        (self.mark)(self.control, ButtonIcon::Success);
    }

    pub fn mark_fail(&self) {
        (self.mark)(self.control, ButtonIcon::Fail);
    }

    /// Restore the descriptor's icon.
    pub fn reset(&self) {
        (self.mark)(self.control, ButtonIcon::Normal);
    }
}

impl fmt::Debug for ActivationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationHandle")
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}

/// One button on the menu grid.
#[derive(Debug, Clone)]
pub struct PermissionButton<N> {
    descriptor: ButtonDescriptor,
    node: N,
    slot: GridSlot,
    icon: ButtonIcon,
}

impl<N> PermissionButton<N> {
    pub fn new(descriptor: ButtonDescriptor, node: N, slot: GridSlot) -> Self {
        Self {
            descriptor,
            node,
            slot,
            icon: ButtonIcon::Normal,
        }
    }

    #[must_use]
    pub fn node(&self) -> &N {
        &self.node
    }

    #[must_use]
    pub fn slot(&self) -> &GridSlot {
        &self.slot
    }

    #[must_use]
    pub fn icon(&self) -> ButtonIcon {
        self.icon
    }

    #[must_use]
    pub fn descriptor(&self) -> &ButtonDescriptor {
        &self.descriptor
    }

    /// Texture path for the current icon state.
    #[must_use]
    pub fn icon_path(&self, icons: &IconSet) -> String {
        match self.icon {
            ButtonIcon::Normal => icons.resolve(&self.descriptor.icon),
            ButtonIcon::Success => icons.success(),
            ButtonIcon::Fail => icons.fail(),
        }
    }

    /// Model matrix for a viewer at `yaw`.
    #[must_use]
    pub fn transform(&self, layout: &ButtonGridLayout, yaw: f32) -> Mat4 {
        layout.transform(&self.slot, yaw)
    }
}

/// Ordered buttons of one menu plus their visibility.
///
/// # Invariants
///
/// - Control `i` always sits in `layout.slot(i, len)`.
/// - While visible, every control's node is attached to the scene, in
///   control order; while hidden, none are.
#[derive(Debug, Clone)]
pub struct ControlGrid<N> {
    layout: ButtonGridLayout,
    controls: Vec<PermissionButton<N>>,
    visible: bool,
}

impl<N: Clone + PartialEq> ControlGrid<N> {
    #[must_use]
    pub fn new(layout: ButtonGridLayout) -> Self {
        Self {
            layout,
            controls: Vec::new(),
            visible: true,
        }
    }

    #[must_use]
    pub fn layout(&self) -> &ButtonGridLayout {
        &self.layout
    }

    #[must_use]
    pub fn controls(&self) -> &[PermissionButton<N>] {
        &self.controls
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.controls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Index of the control owning `node`.
    #[must_use]
    pub fn position_of(&self, node: &N) -> Option<usize> {
        self.controls.iter().position(|c| c.node == *node)
    }

    /// Create buttons for `descriptors` and append them to the grid.
    ///
    /// Existing buttons are re-slotted for the new count. New nodes are
    /// attached only if the grid is visible. Returns the new indices.
    pub fn extend<S>(
        &mut self,
        scene: &mut S,
        icons: &IconSet,
        descriptors: Vec<ButtonDescriptor>,
    ) -> Range<usize>
    where
        S: SceneNodes<Node = N>,
    {
        let start = self.controls.len();
        let count = start + descriptors.len();
        for (offset, descriptor) in descriptors.into_iter().enumerate() {
            let node = scene.create_button_node(&icons.resolve(&descriptor.icon));
            let slot = self.layout.slot(start + offset, count);
            self.controls.push(PermissionButton::new(descriptor, node, slot));
        }
        for (index, control) in self.controls.iter_mut().enumerate().take(start) {
            control.slot = self.layout.slot(index, count);
        }
        if self.visible {
            for control in &self.controls[start..] {
                scene.add_node(&control.node);
            }
        }
        start..count
    }

    /// Push a fresh transform to every attached node.
    pub fn update_transforms<S>(&self, scene: &mut S, yaw: f32)
    where
        S: SceneNodes<Node = N>,
    {
        if !self.visible {
            return;
        }
        for control in &self.controls {
            scene.set_node_transform(&control.node, &control.transform(&self.layout, yaw));
        }
    }

    /// Attach or detach every node. Returns whether anything changed.
    pub fn set_visible<S>(&mut self, scene: &mut S, visible: bool) -> bool
    where
        S: SceneNodes<Node = N>,
    {
        if self.visible == visible {
            return false;
        }
        self.visible = visible;
        for control in &self.controls {
            if visible {
                scene.add_node(&control.node);
            } else {
                scene.remove_node(&control.node);
            }
        }
        true
    }

    /// Flip visibility. Returns the new state.
    pub fn toggle<S>(&mut self, scene: &mut S) -> bool
    where
        S: SceneNodes<Node = N>,
    {
        let visible = !self.visible;
        self.set_visible(scene, visible);
        visible
    }

    /// Swap control `index` to `icon`. Returns `false` for an unknown index.
    pub fn set_icon<S>(&mut self, scene: &mut S, icons: &IconSet, index: usize, icon: ButtonIcon) -> bool
    where
        S: SceneNodes<Node = N>,
    {
        let Some(control) = self.controls.get_mut(index) else {
            return false;
        };
        control.icon = icon;
        scene.set_node_icon(&control.node, &control.icon_path(icons));
        true
    }
}
