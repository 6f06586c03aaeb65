//! Score keeping and the per-tick zone evaluation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collab::FeedbackKind;
use crate::config::{PenaltyConfig, ScoringConfig};
use crate::entity::{Entity, EntityId, EntityKind, EntityRegistry};
use crate::zone::{Zone, ZoneId, ZoneKind};

/// Point total, never below its floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    total: i64,
    floor: i64,
}

impl ScoreState {
    pub fn new(floor: i64) -> Self {
        Self { total: floor.max(0), floor }
    }

    pub fn total(&self) -> i64 {
        self.total
    }

    pub fn floor(&self) -> i64 {
        self.floor
    }

    /// Adds `delta` and clamps at the floor. Returns the new total.
    pub fn apply(&mut self, delta: i64) -> i64 {
        self.total = self.total.saturating_add(delta).max(self.floor);
        self.total
    }

    pub fn reset(&mut self) {
        self.total = self.floor.max(0);
    }

    /// Text handed to the display sink.
    pub fn display_text(&self) -> String {
        format!("Score: {}", self.total)
    }
}

impl Default for ScoreState {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Why an entity left the game without being captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// Fell below the removal height.
    OutOfBounds,
    /// The simulation produced a NaN or infinite transform.
    NonFinite,
}

/// Something that happened to the game during a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    Spawned {
        entity: EntityId,
        kind: EntityKind,
    },
    /// Passed through a ring.
    Scored {
        entity: EntityId,
        zone: ZoneId,
        delta: i64,
        total: i64,
    },
    /// Caught by a basket and removed. `delta` is 0 if the entity had
    /// already scored elsewhere.
    Captured {
        entity: EntityId,
        zone: ZoneId,
        delta: i64,
        total: i64,
    },
    Penalized {
        entity: EntityId,
        delta: i64,
        total: i64,
    },
    Removed {
        entity: EntityId,
        reason: RemovalReason,
    },
    Ended {
        final_score: i64,
    },
}

/// Output of one evaluation pass.
#[derive(Debug, Default)]
pub struct Evaluation {
    pub events: Vec<GameEvent>,
    /// Entities taken out of the registry. Their body and node still exist
    /// and must be released by the caller.
    pub removed: Vec<Entity>,
    /// Zones whose highlight changed.
    pub flashes: Vec<(ZoneId, FeedbackKind)>,
}

/// Tests every live entity against the zones once per tick.
#[derive(Debug, Clone)]
pub struct ScoreEvaluator {
    removal_height: f32,
    penalty: Option<PenaltyConfig>,
    feedback: Duration,
}

impl ScoreEvaluator {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            removal_height: config.removal_height,
            penalty: config.penalty,
            feedback: Duration::from_millis(config.feedback_ms),
        }
    }

    /// Runs one pass in insertion order.
    ///
    /// Entities are removed from `registry` as they are decided; the
    /// registry's tombstoning keeps the rest of the pass intact. Within one
    /// entity, scoring always happens before removal is considered.
    pub fn evaluate(
        &self,
        registry: &mut EntityRegistry,
        zones: &mut [Zone],
        score: &mut ScoreState,
        now: Duration,
    ) -> Evaluation {
        let mut out = Evaluation::default();
        let until = now + self.feedback;

        for slot in 0..registry.slot_count() {
            let Some(entity) = registry.slot_mut(slot) else {
                continue;
            };
            let transform = entity.transform;

            if !transform.is_finite() {
                tracing::warn!(id = %entity.id, "non-finite transform, removing entity");
                out.events.push(GameEvent::Removed {
                    entity: entity.id,
                    reason: RemovalReason::NonFinite,
                });
                out.removed.extend(registry.remove_at(slot));
                continue;
            }

            // rings before baskets, whatever the configured order
            let mut captured = false;
            'zones: for pass in [ZoneKind::Ring, ZoneKind::Basket] {
                for zone in zones.iter_mut().filter(|z| z.kind == pass) {
                    if !zone.contains(&transform) {
                        continue;
                    }
                    match zone.kind {
                        ZoneKind::Ring => {
                            if entity.mark_scored() {
                                let delta = zone.points.delta_for(entity.kind);
                                let total = score.apply(delta);
                                out.events.push(GameEvent::Scored {
                                    entity: entity.id,
                                    zone: zone.id,
                                    delta,
                                    total,
                                });
                                let kind = feedback_for(entity.kind);
                                zone.flash(kind, until);
                                out.flashes.push((zone.id, kind));
                            }
                        }
                        ZoneKind::Basket => {
                            let delta = if entity.mark_scored() {
                                zone.points.delta_for(entity.kind)
                            } else {
                                0
                            };
                            let total = score.apply(delta);
                            out.events.push(GameEvent::Captured {
                                entity: entity.id,
                                zone: zone.id,
                                delta,
                                total,
                            });
                            let kind = feedback_for(entity.kind);
                            zone.flash(kind, until);
                            out.flashes.push((zone.id, kind));
                        }
                    }
                    if zone.removes_on_entry {
                        captured = true;
                        break 'zones;
                    }
                }
            }
            if captured {
                tracing::debug!(id = %entity.id, "entity captured");
                out.removed.extend(registry.remove_at(slot));
                continue;
            }

            if let Some(penalty) = self.penalty {
                if entity.kind == penalty.kind
                    && !entity.has_scored()
                    && transform.height() <= penalty.height
                {
                    entity.mark_scored();
                    let total = score.apply(penalty.delta);
                    out.events.push(GameEvent::Penalized {
                        entity: entity.id,
                        delta: penalty.delta,
                        total,
                    });
                    for zone in zones.iter_mut().filter(|z| z.kind == ZoneKind::Ring) {
                        zone.flash(FeedbackKind::Penalty, until);
                        out.flashes.push((zone.id, FeedbackKind::Penalty));
                    }
                }
            }

            if transform.height() < self.removal_height {
                out.events.push(GameEvent::Removed {
                    entity: entity.id,
                    reason: RemovalReason::OutOfBounds,
                });
                out.removed.extend(registry.remove_at(slot));
            }
        }

        out
    }
}

fn feedback_for(kind: EntityKind) -> FeedbackKind {
    match kind {
        EntityKind::Normal => FeedbackKind::Scored,
        EntityKind::Special => FeedbackKind::Bonus,
    }
}
