//! Seams to the outside world: the scene graph that draws entities and zones,
//! and the display that shows the score and timer text.
//!
//! The core never renders anything itself. It calls these traits in a fixed
//! order once per tick and treats them as sinks.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::entity::{EntityKind, Transform};
use crate::zone::ZoneId;

/// Opaque handle to a visual node owned by the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneNode(pub u64);

/// Transient highlight applied to a zone after a scoring event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    /// A normal entity scored (green).
    Scored,
    /// A special entity scored (gold).
    Bonus,
    /// A penalty was applied (red).
    Penalty,
}

/// Render/scene collaborator.
pub trait SceneGraph {
    /// Creates the visual for a freshly spawned entity.
    fn add_node(&mut self, kind: EntityKind, radius: f32, transform: &Transform) -> SceneNode;

    fn remove_node(&mut self, node: SceneNode);

    /// Copies the simulated transform onto the visual.
    fn sync_transform(&mut self, node: SceneNode, transform: &Transform);

    /// Sets or clears the highlight on a zone.
    fn zone_feedback(&mut self, _zone: ZoneId, _feedback: Option<FeedbackKind>) {}

    /// A zone was moved by the pointer.
    fn move_zone(&mut self, _zone: ZoneId, _center: [f32; 3]) {}
}

/// Display sink collaborator: receives text on every change.
pub trait DisplaySink {
    fn show_score(&mut self, text: &str);

    fn show_timer(&mut self, text: &str);

    /// Emitted once when the game clock runs out.
    fn game_ended(&mut self, final_score: i64);
}

/// Scene graph with no rendering backend. Tracks live nodes and their last
/// transform so that tests and the headless runner can inspect them.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    next_node: u64,
    nodes: HashMap<SceneNode, (EntityKind, Transform)>,
    feedback: HashMap<ZoneId, FeedbackKind>,
    zone_centers: HashMap<ZoneId, [f32; 3]>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_transform(&self, node: SceneNode) -> Option<&Transform> {
        self.nodes.get(&node).map(|(_, t)| t)
    }

    pub fn feedback(&self, zone: ZoneId) -> Option<FeedbackKind> {
        self.feedback.get(&zone).copied()
    }

    pub fn zone_center(&self, zone: ZoneId) -> Option<[f32; 3]> {
        self.zone_centers.get(&zone).copied()
    }
}

impl SceneGraph for HeadlessScene {
    fn add_node(&mut self, kind: EntityKind, _radius: f32, transform: &Transform) -> SceneNode {
        let node = SceneNode(self.next_node);
        self.next_node += 1;
        self.nodes.insert(node, (kind, *transform));
        node
    }

    fn remove_node(&mut self, node: SceneNode) {
        if self.nodes.remove(&node).is_none() {
            tracing::warn!(?node, "removing unknown scene node");
        }
    }

    fn sync_transform(&mut self, node: SceneNode, transform: &Transform) {
        if let Some((_, t)) = self.nodes.get_mut(&node) {
            *t = *transform;
        }
    }

    fn zone_feedback(&mut self, zone: ZoneId, feedback: Option<FeedbackKind>) {
        match feedback {
            Some(kind) => {
                self.feedback.insert(zone, kind);
            }
            None => {
                self.feedback.remove(&zone);
            }
        }
    }

    fn move_zone(&mut self, zone: ZoneId, center: [f32; 3]) {
        self.zone_centers.insert(zone, center);
    }
}

/// Everything a [`RecordingDisplay`] has received.
#[derive(Debug, Clone, Default)]
pub struct DisplayLog {
    pub score_texts: Vec<String>,
    pub timer_texts: Vec<String>,
    pub endings: Vec<i64>,
}

/// Display sink that records into a shared log. Clones share the log, so a
/// test can keep one handle and give the other to the session.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    log: Arc<Mutex<DisplayLog>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DisplayLog {
        self.log.lock().clone()
    }

    pub fn last_score(&self) -> Option<String> {
        self.log.lock().score_texts.last().cloned()
    }

    pub fn last_timer(&self) -> Option<String> {
        self.log.lock().timer_texts.last().cloned()
    }

    pub fn endings(&self) -> Vec<i64> {
        self.log.lock().endings.clone()
    }
}

impl DisplaySink for RecordingDisplay {
    fn show_score(&mut self, text: &str) {
        self.log.lock().score_texts.push(text.to_owned());
    }

    fn show_timer(&mut self, text: &str) {
        self.log.lock().timer_texts.push(text.to_owned());
    }

    fn game_ended(&mut self, final_score: i64) {
        self.log.lock().endings.push(final_score);
    }
}

/// Display sink that writes through `tracing`. Timer refreshes are logged at
/// `trace` since they arrive every frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDisplay;

impl DisplaySink for TracingDisplay {
    fn show_score(&mut self, text: &str) {
        tracing::info!("{text}");
    }

    fn show_timer(&mut self, text: &str) {
        tracing::trace!("{text}");
    }

    fn game_ended(&mut self, final_score: i64) {
        tracing::info!("Time is up! Final score: {final_score}");
    }
}
