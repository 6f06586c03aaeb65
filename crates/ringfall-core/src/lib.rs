//! Ringfall Core Library
//!
//! Falling-entity game logic on top of `Rapier3D` with a fixed timestep.
//!
//! A [`Session`] owns the physics world, the live entities, the scoring zones
//! and the game clock. Rendering and the score/timer display are reached
//! through the [`SceneGraph`] and [`DisplaySink`] traits; time comes from an
//! injectable [`Clock`].

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod collab;
pub mod config;
pub mod entity;
pub mod game;
pub mod physics;
pub mod score;
pub mod spawner;
pub mod timer;
pub mod zone;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collab::{
    DisplaySink, FeedbackKind, HeadlessScene, RecordingDisplay, SceneGraph, SceneNode,
    TracingDisplay,
};
pub use config::{ConfigError, GameConfig};
pub use entity::{Entity, EntityId, EntityKind, EntityRegistry, Transform};
pub use game::{GamePhase, Session, SessionError};
pub use physics::{PHYSICS_DT, PhysicsWorld, default_gravity};
pub use score::{GameEvent, RemovalReason, ScoreEvaluator, ScoreState};
pub use spawner::{SpawnRequest, Spawner};
pub use timer::{TimerController, format_elapsed};
pub use zone::{ScoreTable, Zone, ZoneId, ZoneKind};
