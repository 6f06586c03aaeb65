//! Game session: the Idle/Running/Ended state machine driving one arena.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::collab::{DisplaySink, SceneGraph};
use crate::config::{ConfigError, GameConfig};
use crate::entity::{Entity, EntityId, EntityKind, EntityRegistry, Transform};
use crate::physics::{BodyDesc, BodyShape, PhysicsWorld, SurfaceMaterial};
use crate::score::{GameEvent, ScoreEvaluator, ScoreState};
use crate::spawner::{SpawnRequest, Spawner};
use crate::timer::TimerController;
use crate::zone::{Zone, ZoneId};

/// Half height of the thin sensor disc mirroring each zone.
const ZONE_SENSOR_HALF_HEIGHT: f32 = 0.05;

/// Session phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GamePhase {
    /// Nothing spawns and the clock is stopped. Entities may remain.
    #[default]
    Idle,
    /// Spawner and timer are both active.
    Running,
    /// The time limit was reached. Waiting for `start` or `reset`.
    Ended,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("unknown zone {0}")]
    UnknownZone(ZoneId),
}

/// One game: physics, entities, zones, score and clock behind a single owner.
///
/// Call [`Session::frame`] once per rendered frame. Everything runs on the
/// caller's thread.
pub struct Session<S: SceneGraph, D: DisplaySink> {
    config: GameConfig,
    phase: GamePhase,
    clock: Box<dyn Clock>,
    physics: PhysicsWorld,
    registry: EntityRegistry,
    spawner: Spawner,
    evaluator: ScoreEvaluator,
    score: ScoreState,
    timer: TimerController,
    zones: Vec<Zone>,
    scene: S,
    display: D,
    next_entity: u64,
}

impl<S: SceneGraph, D: DisplaySink> Session<S, D> {
    /// Builds the arena described by `config` and shows the initial score
    /// and timer.
    pub fn new(
        config: GameConfig,
        clock: impl Clock + 'static,
        mut scene: S,
        mut display: D,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut physics = PhysicsWorld::with_gravity(config.physics.gravity);
        physics.set_default_contact_material(config.physics.default_contact);
        for pair in &config.physics.contacts {
            physics.register_contact_material(pair.a, pair.b, pair.material);
        }

        let arena = &config.arena;
        if arena.floor {
            physics.add_body(&BodyDesc::fixed(
                BodyShape::Plane,
                [0.0, arena.floor_height, 0.0],
                SurfaceMaterial::Ground,
            ));
        }
        for wall in &arena.walls {
            physics.add_body(&BodyDesc::fixed(
                BodyShape::Box {
                    half_extents: wall.half_extents,
                },
                wall.center,
                SurfaceMaterial::Wall,
            ));
        }

        let mut zones = Vec::with_capacity(config.zones.len());
        for (index, zone_config) in config.zones.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let id = ZoneId(index as u32);
            let mut zone = Zone::new(
                id,
                zone_config.kind,
                zone_config.center,
                zone_config.radius,
                zone_config.height.unwrap_or(zone_config.center[1]),
                zone_config.points,
            );
            if let Some(removes) = zone_config.removes_on_entry {
                zone.removes_on_entry = removes;
            }
            let sensor = BodyDesc::fixed(
                BodyShape::Cylinder {
                    radius: zone.radius,
                    half_height: ZONE_SENSOR_HALF_HEIGHT,
                },
                zone.center,
                SurfaceMaterial::Target,
            )
            .with_sensor(true);
            zone.body = Some(physics.add_body(&sensor));
            scene.move_zone(id, zone.center);
            zones.push(zone);
        }

        let score = ScoreState::new(config.scoring.floor);
        let mut timer = TimerController::new(&config.timer);
        display.show_score(&score.display_text());
        display.show_timer(&timer.reset());

        tracing::info!(
            zones = zones.len(),
            variants = config.spawner.variants.len(),
            seed = config.seed,
            "session created"
        );

        Ok(Self {
            spawner: Spawner::new(config.spawner.clone(), config.seed),
            evaluator: ScoreEvaluator::new(&config.scoring),
            config,
            phase: GamePhase::Idle,
            clock: Box::new(clock),
            physics,
            registry: EntityRegistry::new(),
            score,
            timer,
            zones,
            scene,
            display,
            next_entity: 0,
        })
    }

    /// Arms the spawner and the timer.
    /// Returns false if the session is already running.
    pub fn start(&mut self) -> bool {
        if self.phase == GamePhase::Running {
            tracing::debug!("start ignored, already running");
            return false;
        }
        let now = self.clock.now();
        // the timer restarts from zero on its own when leaving Ended
        self.timer.start(now);
        self.spawner.start(now);
        self.phase = GamePhase::Running;
        tracing::info!(elapsed = ?self.timer.elapsed(now), "session started");
        true
    }

    /// Disarms the spawner and freezes the timer. Entities and score stay.
    /// Returns false if the session was not running.
    pub fn stop(&mut self) -> bool {
        if self.phase != GamePhase::Running {
            tracing::debug!(phase = ?self.phase, "stop ignored, not running");
            return false;
        }
        let now = self.clock.now();
        self.spawner.stop();
        self.timer.stop(now);
        self.phase = GamePhase::Idle;
        tracing::info!(elapsed = ?self.timer.elapsed(now), score = self.score.total(), "session stopped");
        true
    }

    /// Clears every entity, zeroes score and timer, and returns to Idle.
    pub fn reset(&mut self) {
        self.spawner.reset();

        let entities = self.registry.drain();
        let cleared = entities.len();
        for entity in entities {
            self.release(&entity);
        }

        self.score.reset();
        self.display.show_score(&self.score.display_text());
        let zero = self.timer.reset();
        self.display.show_timer(&zero);

        for zone in &mut self.zones {
            if zone.feedback().is_some() {
                zone.clear_feedback();
                self.scene.zone_feedback(zone.id, None);
            }
        }

        self.phase = GamePhase::Idle;
        tracing::info!(cleared, "session reset");
    }

    /// Repositions a zone. Takes effect on the next evaluation.
    pub fn move_zone(&mut self, id: ZoneId, center: [f32; 3]) -> Result<(), SessionError> {
        let zone = self
            .zones
            .iter_mut()
            .find(|z| z.id == id)
            .ok_or(SessionError::UnknownZone(id))?;
        zone.move_to(center);
        if let Some(body) = zone.body {
            self.physics.set_position(body, center);
        }
        self.scene.move_zone(id, center);
        Ok(())
    }

    /// Drops an entity at rest at `position`, outside the spawn schedule.
    ///
    /// Size and mass come from the first configured variant of `kind`.
    pub fn spawn_at(&mut self, kind: EntityKind, position: [f32; 3]) -> EntityId {
        let variants = &self.config.spawner.variants;
        let (radius, mass) = variants
            .iter()
            .find(|v| v.kind == kind)
            .or_else(|| variants.first())
            .map_or((0.2, 0.3), |v| (v.radius, v.mass));

        let request = SpawnRequest {
            kind,
            position,
            velocity: [0.0; 3],
            radius,
            mass,
            due: self.clock.now(),
        };
        self.spawn(&request)
    }

    /// Advances the game by one frame: timer, spawns, then one tick.
    pub fn frame(&mut self) -> Vec<GameEvent> {
        let now = self.clock.now();
        let mut events = Vec::new();

        let poll = self.timer.poll(now);
        if let Some(text) = &poll.display {
            self.display.show_timer(text);
        }
        if poll.expired {
            self.expire(&mut events);
        }

        for request in self.spawner.poll(now) {
            let entity = self.spawn(&request);
            events.push(GameEvent::Spawned {
                entity,
                kind: request.kind,
            });
        }

        events.extend(self.tick());
        events
    }

    /// One fixed step: physics, transform sync, scoring, removal, render.
    pub fn tick(&mut self) -> Vec<GameEvent> {
        let now = self.clock.now();
        self.physics.step();

        for entity in self.registry.iter_mut() {
            if let Some(transform) = self.physics.transform(entity.body) {
                entity.transform = transform;
            }
        }

        let before = self.score.total();
        let evaluation =
            self.evaluator
                .evaluate(&mut self.registry, &mut self.zones, &mut self.score, now);

        for entity in &evaluation.removed {
            self.release(entity);
        }
        self.registry.compact();

        if self.score.total() != before {
            self.display.show_score(&self.score.display_text());
        }
        for (zone, kind) in &evaluation.flashes {
            self.scene.zone_feedback(*zone, Some(*kind));
        }
        for zone in &mut self.zones {
            if zone.expire_feedback(now) {
                self.scene.zone_feedback(zone.id, None);
            }
        }

        for entity in self.registry.iter() {
            self.scene.sync_transform(entity.node, &entity.transform);
        }

        tracing::trace!(
            frame = self.physics.current_frame(),
            entities = self.registry.len(),
            events = evaluation.events.len(),
            "tick"
        );
        evaluation.events
    }

    fn spawn(&mut self, request: &SpawnRequest) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;

        let body = self.physics.add_body(&BodyDesc::ball(
            request.radius,
            request.mass,
            request.position,
            request.velocity,
        ));
        let transform = Transform::from_position(request.position);
        let node = self.scene.add_node(request.kind, request.radius, &transform);
        self.registry.add(Entity::new(
            id,
            request.kind,
            node,
            body,
            request.radius,
            request.due,
            transform,
        ));

        tracing::debug!(%id, kind = ?request.kind, position = ?request.position, "entity spawned");
        id
    }

    fn release(&mut self, entity: &Entity) {
        self.physics.remove_body(entity.body);
        self.scene.remove_node(entity.node);
        tracing::debug!(id = %entity.id, "entity released");
    }

    fn expire(&mut self, events: &mut Vec<GameEvent>) {
        self.spawner.stop();
        self.phase = GamePhase::Ended;
        let final_score = self.score.total();
        self.display.game_ended(final_score);
        events.push(GameEvent::Ended { final_score });
        tracing::info!(final_score, "game ended");

        if self.config.auto_reset_on_expiry {
            self.reset();
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn score(&self) -> i64 {
        self.score.total()
    }

    pub fn elapsed(&self) -> Duration {
        self.timer.elapsed(self.clock.now())
    }

    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn spawner(&self) -> &Spawner {
        &self.spawner
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn display(&self) -> &D {
        &self.display
    }
}
