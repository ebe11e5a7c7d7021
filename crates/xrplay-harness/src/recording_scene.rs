#![forbid(unsafe_code)]

//! Scene double that records every call.
//!
//! Like [`FakeHost`](crate::FakeHost), a [`RecordingScene`] is a clone
//! handle: give one clone to the application and inspect through another.
//! Selections hit whichever node the fake input source targets, provided
//! that node is attached.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Mat4;
use xrplay_runtime::{Scene, SceneNodes};

use crate::fake_host::{FakeContext, FakeFrame, FakeHost, FakeInputSource, FakePose, FakeSession, FakeSpace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// One recorded scene call.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    CreateButton { node: NodeId, icon: String },
    AddNode(NodeId),
    RemoveNode(NodeId),
    SetTransform(NodeId, Mat4),
    SetIcon(NodeId, String),
    SetRenderer(FakeContext),
    UseControllerMeshes(FakeSession),
    StartFrame,
    EndFrame,
    UpdateInputSources(FakeSpace),
    HandleSelect(Option<NodeId>),
    DrawFrame { time: f64, pose: Option<FakePose> },
}

impl SceneEvent {
    /// Per-frame bracketing and draw calls.
    #[must_use]
    pub fn is_frame_step(&self) -> bool {
        matches!(
            self,
            Self::StartFrame
                | Self::EndFrame
                | Self::UpdateInputSources(_)
                | Self::SetTransform(..)
                | Self::DrawFrame { .. }
        )
    }
}

#[derive(Default)]
struct SceneLog {
    next_node: u32,
    events: Vec<SceneEvent>,
    attached: Vec<NodeId>,
}

#[derive(Clone, Default)]
pub struct RecordingScene {
    log: Rc<RefCell<SceneLog>>,
}

impl RecordingScene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<SceneEvent> {
        self.log.borrow().events.clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().events.clear();
    }

    /// Attached nodes in attachment order.
    #[must_use]
    pub fn attached(&self) -> Vec<NodeId> {
        self.log.borrow().attached.clone()
    }

    /// Latest transform pushed to `node`.
    #[must_use]
    pub fn transform_of(&self, node: NodeId) -> Option<Mat4> {
        self.log.borrow().events.iter().rev().find_map(|e| match e {
            SceneEvent::SetTransform(n, m) if *n == node => Some(*m),
            _ => None,
        })
    }

    /// Latest icon shown by `node`, including its creation icon.
    #[must_use]
    pub fn icon_of(&self, node: NodeId) -> Option<String> {
        self.log.borrow().events.iter().rev().find_map(|e| match e {
            SceneEvent::SetIcon(n, icon) | SceneEvent::CreateButton { node: n, icon } if *n == node => {
                Some(icon.clone())
            }
            _ => None,
        })
    }

    #[must_use]
    pub fn count(&self, predicate: impl Fn(&SceneEvent) -> bool) -> usize {
        self.log.borrow().events.iter().filter(|e| predicate(e)).count()
    }

    fn push(&self, event: SceneEvent) {
        self.log.borrow_mut().events.push(event);
    }
}

impl SceneNodes for RecordingScene {
    type Node = NodeId;

    fn create_button_node(&mut self, icon: &str) -> NodeId {
        let node = {
            let mut log = self.log.borrow_mut();
            log.next_node += 1;
            NodeId(log.next_node)
        };
        self.push(SceneEvent::CreateButton {
            node,
            icon: icon.to_string(),
        });
        node
    }

    fn add_node(&mut self, node: &NodeId) {
        self.push(SceneEvent::AddNode(*node));
        self.log.borrow_mut().attached.push(*node);
    }

    fn remove_node(&mut self, node: &NodeId) {
        self.push(SceneEvent::RemoveNode(*node));
        self.log.borrow_mut().attached.retain(|n| n != node);
    }

    fn set_node_transform(&mut self, node: &NodeId, transform: &Mat4) {
        self.push(SceneEvent::SetTransform(*node, *transform));
    }

    fn set_node_icon(&mut self, node: &NodeId, icon: &str) {
        self.push(SceneEvent::SetIcon(*node, icon.to_string()));
    }
}

impl Scene<FakeHost> for RecordingScene {
    fn set_renderer(&mut self, context: &FakeContext) {
        self.push(SceneEvent::SetRenderer(*context));
    }

    fn use_profile_controller_meshes(&mut self, session: &FakeSession) {
        self.push(SceneEvent::UseControllerMeshes(*session));
    }

    fn start_frame(&mut self) {
        self.push(SceneEvent::StartFrame);
    }

    fn end_frame(&mut self) {
        self.push(SceneEvent::EndFrame);
    }

    fn update_input_sources(&mut self, _frame: &FakeFrame, space: &FakeSpace) {
        self.push(SceneEvent::UpdateInputSources(space.clone()));
    }

    fn handle_select(
        &mut self,
        source: &FakeInputSource,
        _frame: &FakeFrame,
        _space: &FakeSpace,
    ) -> Option<NodeId> {
        let hit = source
            .target
            .filter(|target| self.log.borrow().attached.contains(target));
        self.push(SceneEvent::HandleSelect(hit));
        hit
    }

    fn draw_xr_frame(&mut self, frame: &FakeFrame, pose: Option<&FakePose>) {
        self.push(SceneEvent::DrawFrame {
            time: frame.time,
            pose: pose.cloned(),
        });
    }
}
