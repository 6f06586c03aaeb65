//! Scoring zones.

use std::fmt;
use std::time::Duration;

use rapier3d::prelude::RigidBodyHandle;
use serde::{Deserialize, Serialize};

use crate::collab::FeedbackKind;
use crate::entity::{EntityKind, Transform};

/// Identifier of a zone, its index in the session's zone list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(pub u32);

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zone{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    /// Entities pass through and keep falling.
    Ring,
    /// Entities are captured and leave the game.
    Basket,
}

/// Points awarded per entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreTable {
    pub normal: i64,
    pub special: i64,
}

impl ScoreTable {
    pub const fn delta_for(&self, kind: EntityKind) -> i64 {
        match kind {
            EntityKind::Normal => self.normal,
            EntityKind::Special => self.special,
        }
    }
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self {
            normal: 1,
            special: 5,
        }
    }
}

/// A region tested against entity positions every tick.
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: ZoneId,
    pub kind: ZoneKind,
    pub center: [f32; 3],
    /// Planar (XZ) radius.
    pub radius: f32,
    /// Entities must be below this height to trigger the zone.
    pub height: f32,
    pub points: ScoreTable,
    pub removes_on_entry: bool,
    /// Static sensor body mirroring the zone in the physics world.
    pub body: Option<RigidBodyHandle>,
    feedback: Option<(FeedbackKind, Duration)>,
}

impl Zone {
    pub fn new(
        id: ZoneId,
        kind: ZoneKind,
        center: [f32; 3],
        radius: f32,
        height: f32,
        points: ScoreTable,
    ) -> Self {
        Self {
            id,
            kind,
            center,
            radius,
            height,
            points,
            removes_on_entry: kind == ZoneKind::Basket,
            body: None,
            feedback: None,
        }
    }

    /// Whether `transform` lies inside the zone right now.
    pub fn contains(&self, transform: &Transform) -> bool {
        transform.height() < self.height && transform.planar_distance(self.center) < self.radius
    }

    /// Moves the zone. The height threshold is left untouched.
    pub fn move_to(&mut self, center: [f32; 3]) {
        self.center = center;
    }

    /// Starts a highlight that lasts until `until`, replacing any current one.
    pub fn flash(&mut self, kind: FeedbackKind, until: Duration) {
        self.feedback = Some((kind, until));
    }

    pub fn feedback(&self) -> Option<FeedbackKind> {
        self.feedback.map(|(kind, _)| kind)
    }

    /// Clears an expired highlight. Returns `true` if one was cleared.
    pub fn expire_feedback(&mut self, now: Duration) -> bool {
        match self.feedback {
            Some((_, until)) if now >= until => {
                self.feedback = None;
                true
            }
            _ => false,
        }
    }

    pub fn clear_feedback(&mut self) {
        self.feedback = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> Zone {
        Zone::new(ZoneId(0), ZoneKind::Ring, [0.0, 5.0, 0.0], 1.0, 5.0, ScoreTable::default())
    }

    #[test]
    fn test_contains_requires_height_and_radius() {
        let zone = ring();
        assert!(zone.contains(&Transform::from_position([0.5, 4.9, 0.0])));
        assert!(!zone.contains(&Transform::from_position([0.5, 5.1, 0.0])));
        assert!(!zone.contains(&Transform::from_position([1.5, 4.0, 0.0])));
    }

    #[test]
    fn test_contains_uses_current_center() {
        let mut zone = ring();
        let t = Transform::from_position([3.0, 4.0, 3.0]);
        assert!(!zone.contains(&t));
        zone.move_to([3.0, 5.0, 3.2]);
        assert!(zone.contains(&t));
    }

    #[test]
    fn test_feedback_expires() {
        let mut zone = ring();
        zone.flash(FeedbackKind::Bonus, Duration::from_millis(500));
        assert_eq!(zone.feedback(), Some(FeedbackKind::Bonus));
        assert!(!zone.expire_feedback(Duration::from_millis(499)));
        assert!(zone.expire_feedback(Duration::from_millis(500)));
        assert_eq!(zone.feedback(), None);
    }

    #[test]
    fn test_basket_removes_on_entry() {
        let basket = Zone::new(ZoneId(1), ZoneKind::Basket, [0.0; 3], 1.0, 1.0, ScoreTable::default());
        assert!(basket.removes_on_entry);
        assert!(!ring().removes_on_entry);
    }
}
