//! Game configuration loaded from JSON.
//!
//! Two presets are compiled in: `ring_toss` (falling balls scored through a
//! pointer-driven ring, golden bonus balls, one-minute clock) and
//! `basket_drop` (balls captured by a basket at the origin, no clock).

use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;
use crate::physics::{ContactMaterial, SurfaceMaterial, default_gravity};
use crate::zone::{ScoreTable, ZoneKind};

/// Errors raised while loading or validating a [`GameConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("spawner needs at least one variant")]
    NoVariants,
    #[error("spawn bounds on {axis} are inverted: [{min}, {max}]")]
    InvertedBounds { axis: &'static str, min: f32, max: f32 },
    #[error("{field} must be finite")]
    NonFinite { field: String },
    #[error("variant {index}: {field} must be positive")]
    Variant { index: usize, field: &'static str },
    #[error("spawner.max_catch_up must be at least 1")]
    ZeroCatchUp,
    #[error("zone {index}: radius must be positive, got {radius}")]
    ZoneRadius { index: usize, radius: f32 },
}

/// Complete configuration of one game session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Seed for spawn placement.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub arena: ArenaConfig,
    pub spawner: SpawnerConfig,
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub timer: TimerConfig,
    /// Reset the session right after the game-ended notification.
    #[serde(default)]
    pub auto_reset_on_expiry: bool,
}

fn default_seed() -> u64 {
    12345
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 3],
    /// Material for surface pairs with no explicit entry.
    #[serde(default)]
    pub default_contact: ContactMaterial,
    #[serde(default)]
    pub contacts: Vec<ContactPairConfig>,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            default_contact: ContactMaterial::default(),
            contacts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactPairConfig {
    pub a: SurfaceMaterial,
    pub b: SurfaceMaterial,
    #[serde(flatten)]
    pub material: ContactMaterial,
}

/// Static geometry around the play area.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Adds an infinite ground plane at `floor_height`.
    #[serde(default)]
    pub floor: bool,
    #[serde(default)]
    pub floor_height: f32,
    #[serde(default)]
    pub walls: Vec<WallConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallConfig {
    pub center: [f32; 3],
    pub half_extents: [f32; 3],
}

/// Rectangle on the XZ plane where entities appear.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpawnBounds {
    pub x: [f32; 2],
    pub z: [f32; 2],
}

/// Spawn height: a fixed value or a `[min, max]` range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpawnHeight {
    Fixed(f32),
    Range([f32; 2]),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnerConfig {
    pub bounds: SpawnBounds,
    pub height: SpawnHeight,
    /// Horizontal start velocity is uniform in `[-jitter/2, jitter/2]` per axis.
    #[serde(default)]
    pub velocity_jitter: f32,
    /// Most spawns one trigger may emit in a single poll. A larger backlog
    /// (the clock jumped) is dropped and the trigger rearms from now.
    #[serde(default = "default_max_catch_up")]
    pub max_catch_up: u32,
    pub variants: Vec<VariantConfig>,
}

fn default_max_catch_up() -> u32 {
    32
}

/// One spawnable variant. Variants sharing a period share one trigger and
/// are chosen by weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    pub kind: EntityKind,
    /// Non-positive values are clamped to the minimum period.
    pub period_ms: i64,
    pub radius: f32,
    pub mass: f32,
    #[serde(default = "default_weight")]
    pub weight: f32,
}

fn default_weight() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub kind: ZoneKind,
    pub center: [f32; 3],
    pub radius: f32,
    /// Height threshold. Defaults to the center's Y.
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub points: ScoreTable,
    /// Overrides the kind's default (baskets remove, rings don't).
    #[serde(default)]
    pub removes_on_entry: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Lowest score a penalty can reach.
    #[serde(default)]
    pub floor: i64,
    /// Entities below this height are removed.
    #[serde(default = "default_removal_height")]
    pub removal_height: f32,
    #[serde(default)]
    pub penalty: Option<PenaltyConfig>,
    #[serde(default = "default_feedback_ms")]
    pub feedback_ms: u64,
}

fn default_removal_height() -> f32 {
    -10.0
}

fn default_feedback_ms() -> u64 {
    500
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            floor: 0,
            removal_height: default_removal_height(),
            penalty: None,
            feedback_ms: default_feedback_ms(),
        }
    }
}

/// Penalty for entities of `kind` that reach `height` without scoring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PenaltyConfig {
    pub kind: EntityKind,
    pub height: f32,
    pub delta: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default)]
    pub limit_ms: Option<u64>,
    #[serde(default = "default_refresh_ms")]
    pub refresh_ms: u64,
}

fn default_refresh_ms() -> u64 {
    10
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            limit_ms: None,
            refresh_ms: default_refresh_ms(),
        }
    }
}

impl GameConfig {
    /// Loads a configuration from a JSON string and validates it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Ring toss: a pointer-driven ring, golden bonus balls, one-minute clock.
    pub fn ring_toss() -> Self {
        const RING_TOSS_JSON: &str = include_str!("../presets/ring_toss.json");
        Self::from_json(RING_TOSS_JSON).expect("Failed to parse ring_toss preset")
    }

    /// Basket drop: balls captured by a basket at the origin.
    pub fn basket_drop() -> Self {
        const BASKET_DROP_JSON: &str = include_str!("../presets/basket_drop.json");
        Self::from_json(BASKET_DROP_JSON).expect("Failed to parse basket_drop preset")
    }

    /// Looks up a compiled-in preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "ring_toss" => Some(Self::ring_toss()),
            "basket_drop" => Some(Self::basket_drop()),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_finite("physics.gravity", &self.physics.gravity)?;

        let spawner = &self.spawner;
        if spawner.variants.is_empty() {
            return Err(ConfigError::NoVariants);
        }
        for (axis, [min, max]) in [("x", spawner.bounds.x), ("z", spawner.bounds.z)] {
            check_finite("spawner.bounds", &[min, max])?;
            if min > max {
                return Err(ConfigError::InvertedBounds { axis, min, max });
            }
        }
        match spawner.height {
            SpawnHeight::Fixed(h) => check_finite("spawner.height", &[h])?,
            SpawnHeight::Range([min, max]) => {
                check_finite("spawner.height", &[min, max])?;
                if min > max {
                    return Err(ConfigError::InvertedBounds {
                        axis: "height",
                        min,
                        max,
                    });
                }
            }
        }
        check_finite("spawner.velocity_jitter", &[spawner.velocity_jitter])?;
        if spawner.max_catch_up == 0 {
            return Err(ConfigError::ZeroCatchUp);
        }
        for (index, variant) in spawner.variants.iter().enumerate() {
            if !is_positive(variant.radius) {
                return Err(ConfigError::Variant { index, field: "radius" });
            }
            if !is_positive(variant.mass) {
                return Err(ConfigError::Variant { index, field: "mass" });
            }
            if !is_positive(variant.weight) {
                return Err(ConfigError::Variant { index, field: "weight" });
            }
        }

        for (index, zone) in self.zones.iter().enumerate() {
            check_finite("zones.center", &zone.center)?;
            if !is_positive(zone.radius) {
                return Err(ConfigError::ZoneRadius {
                    index,
                    radius: zone.radius,
                });
            }
            if let Some(h) = zone.height {
                check_finite("zones.height", &[h])?;
            }
        }

        check_finite("scoring.removal_height", &[self.scoring.removal_height])?;
        for wall in &self.arena.walls {
            check_finite("arena.walls", &wall.center)?;
            check_finite("arena.walls", &wall.half_extents)?;
        }
        Ok(())
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn check_finite(field: &str, values: &[f32]) -> Result<(), ConfigError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ConfigError::NonFinite {
            field: field.to_owned(),
        })
    }
}
