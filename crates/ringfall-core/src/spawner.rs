//! Periodic, deterministic entity spawning.
//!
//! Each distinct variant period arms its own trigger. Triggers are polled
//! with the current clock time and emit one request per elapsed period, so a
//! frame that arrives late catches up instead of dropping spawns. Catch-up is
//! bounded by `max_catch_up`; a longer gap drops the backlog and rearms.

use std::time::Duration;

use rand::prelude::*;
use rand::seq::IndexedRandom;
use rand_chacha::ChaCha8Rng;

use crate::config::{SpawnHeight, SpawnerConfig, VariantConfig};
use crate::entity::EntityKind;

/// Shortest allowed spawn period.
pub const MIN_SPAWN_PERIOD: Duration = Duration::from_millis(1);

/// Everything the session needs to materialize one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRequest {
    pub kind: EntityKind,
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub radius: f32,
    pub mass: f32,
    /// Clock time at which the trigger fired.
    pub due: Duration,
}

#[derive(Debug, Clone)]
struct Trigger {
    period: Duration,
    /// Indices into the variant list.
    variants: Vec<usize>,
    next_due: Option<Duration>,
}

/// Clamps a configured period (milliseconds, possibly non-positive).
pub fn clamp_period(period_ms: i64) -> Duration {
    match u64::try_from(period_ms) {
        Ok(ms) if ms > 0 => Duration::from_millis(ms).max(MIN_SPAWN_PERIOD),
        _ => {
            tracing::warn!(period_ms, "non-positive spawn period clamped to {MIN_SPAWN_PERIOD:?}");
            MIN_SPAWN_PERIOD
        }
    }
}

/// Spawn scheduler.
#[derive(Debug, Clone)]
pub struct Spawner {
    config: SpawnerConfig,
    triggers: Vec<Trigger>,
    rng: ChaCha8Rng,
    seed: u64,
    running: bool,
    spawned: u64,
}

impl Spawner {
    pub fn new(config: SpawnerConfig, seed: u64) -> Self {
        let mut triggers: Vec<Trigger> = Vec::new();
        for (index, variant) in config.variants.iter().enumerate() {
            let period = clamp_period(variant.period_ms);
            match triggers.iter_mut().find(|t| t.period == period) {
                Some(trigger) => trigger.variants.push(index),
                None => triggers.push(Trigger {
                    period,
                    variants: vec![index],
                    next_due: None,
                }),
            }
        }

        Self {
            config,
            triggers,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            running: false,
            spawned: 0,
        }
    }

    /// Arms every trigger. Calling it while running does nothing.
    pub fn start(&mut self, now: Duration) {
        if self.running {
            return;
        }
        self.running = true;
        for trigger in &mut self.triggers {
            trigger.next_due = Some(now + trigger.period);
        }
        tracing::debug!(triggers = self.triggers.len(), "spawner started");
    }

    /// Disarms every trigger. No request is produced until the next `start`.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        for trigger in &mut self.triggers {
            trigger.next_due = None;
        }
        tracing::debug!(spawned = self.spawned, "spawner stopped");
    }

    /// Stops and re-seeds, so the next run repeats the same placements.
    pub fn reset(&mut self) {
        self.stop();
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.spawned = 0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Total requests produced since the last reset.
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Periods of the armed triggers, shortest first.
    pub fn periods(&self) -> Vec<Duration> {
        let mut periods: Vec<Duration> = self.triggers.iter().map(|t| t.period).collect();
        periods.sort();
        periods
    }

    /// Collects every spawn due at or before `now`, in due-time order.
    pub fn poll(&mut self, now: Duration) -> Vec<SpawnRequest> {
        if !self.running {
            return Vec::new();
        }

        let limit = self.config.max_catch_up;
        let mut due: Vec<(Duration, usize)> = Vec::new();
        for (index, trigger) in self.triggers.iter_mut().enumerate() {
            let Some(mut next) = trigger.next_due else {
                continue;
            };
            let mut emitted = 0;
            while next <= now {
                if emitted == limit {
                    let skipped = (now - next).as_nanos() / trigger.period.as_nanos() + 1;
                    tracing::warn!(period = ?trigger.period, skipped, "spawn backlog dropped");
                    next = now + trigger.period;
                    break;
                }
                due.push((next, index));
                next += trigger.period;
                emitted += 1;
            }
            trigger.next_due = Some(next);
        }
        // stable: ties keep trigger order
        due.sort_by_key(|(at, _)| *at);

        let mut requests = Vec::with_capacity(due.len());
        for (at, index) in due {
            let variant = self.pick_variant(index);
            requests.push(self.build_request(&variant, at));
        }
        self.spawned += requests.len() as u64;
        requests
    }

    fn pick_variant(&mut self, trigger: usize) -> VariantConfig {
        let candidates = &self.triggers[trigger].variants;
        let index = if candidates.len() == 1 {
            candidates[0]
        } else {
            let variants = &self.config.variants;
            candidates
                .choose_weighted(&mut self.rng, |&i| variants[i].weight)
                .copied()
                .unwrap_or(candidates[0])
        };
        self.config.variants[index].clone()
    }

    fn build_request(&mut self, variant: &VariantConfig, due: Duration) -> SpawnRequest {
        let bounds = self.config.bounds;
        let x = sample(&mut self.rng, bounds.x);
        let z = sample(&mut self.rng, bounds.z);
        let y = match self.config.height {
            SpawnHeight::Fixed(h) => h,
            SpawnHeight::Range(range) => sample(&mut self.rng, range),
        };

        let jitter = self.config.velocity_jitter;
        let velocity = if jitter > 0.0 {
            [
                (self.rng.random::<f32>() - 0.5) * jitter,
                0.0,
                (self.rng.random::<f32>() - 0.5) * jitter,
            ]
        } else {
            [0.0; 3]
        };

        SpawnRequest {
            kind: variant.kind,
            position: [x, y, z],
            velocity,
            radius: variant.radius,
            mass: variant.mass,
            due,
        }
    }
}

fn sample(rng: &mut ChaCha8Rng, [min, max]: [f32; 2]) -> f32 {
    if min < max { rng.random_range(min..max) } else { min }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpawnBounds;

    fn variant(kind: EntityKind, period_ms: i64) -> VariantConfig {
        VariantConfig {
            kind,
            period_ms,
            radius: 0.2,
            mass: 0.3,
            weight: 1.0,
        }
    }

    fn config(variants: Vec<VariantConfig>) -> SpawnerConfig {
        SpawnerConfig {
            bounds: SpawnBounds {
                x: [-5.0, 5.0],
                z: [-5.0, 5.0],
            },
            height: SpawnHeight::Fixed(30.0),
            velocity_jitter: 1.0,
            max_catch_up: 32,
            variants,
        }
    }

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn test_spawn_count_matches_period() {
        let mut spawner = Spawner::new(config(vec![variant(EntityKind::Normal, 500)]), 1);
        spawner.start(Duration::ZERO);

        let mut total = 0;
        for t in (0..=10_000).step_by(16) {
            total += spawner.poll(ms(t)).len();
        }
        // last poll is at 10_000 ms
        assert_eq!(total, 20);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut spawner = Spawner::new(config(vec![variant(EntityKind::Normal, 500)]), 1);
        spawner.start(Duration::ZERO);
        spawner.start(ms(250));

        assert_eq!(spawner.poll(ms(2_000)).len(), 4);
    }

    #[test]
    fn test_stop_prevents_further_spawns() {
        let mut spawner = Spawner::new(config(vec![variant(EntityKind::Normal, 500)]), 1);
        spawner.start(Duration::ZERO);
        assert_eq!(spawner.poll(ms(1_000)).len(), 2);

        spawner.stop();
        assert!(spawner.poll(ms(5_000)).is_empty());
        assert!(!spawner.is_running());
    }

    #[test]
    fn test_restart_rearms_from_now() {
        let mut spawner = Spawner::new(config(vec![variant(EntityKind::Normal, 500)]), 1);
        spawner.start(Duration::ZERO);
        spawner.stop();
        spawner.start(ms(10_000));
        assert!(spawner.poll(ms(10_499)).is_empty());
        assert_eq!(spawner.poll(ms(10_500)).len(), 1);
    }

    #[test]
    fn test_independent_periods_per_variant() {
        let mut spawner = Spawner::new(
            config(vec![
                variant(EntityKind::Normal, 500),
                variant(EntityKind::Special, 5_000),
            ]),
            7,
        );
        spawner.start(Duration::ZERO);

        let requests = spawner.poll(ms(10_000));
        let special = requests.iter().filter(|r| r.kind == EntityKind::Special).count();
        assert_eq!(requests.len(), 22);
        assert_eq!(special, 2);
        assert!(requests.windows(2).all(|w| w[0].due <= w[1].due));
    }

    #[test]
    fn test_clock_jump_drops_backlog() {
        let mut cfg = config(vec![variant(EntityKind::Normal, 100)]);
        cfg.max_catch_up = 5;
        let mut spawner = Spawner::new(cfg, 1);
        spawner.start(Duration::ZERO);

        // an hour passes between two polls
        let requests = spawner.poll(ms(3_600_000));
        assert_eq!(requests.len(), 5);
        assert_eq!(requests[4].due, ms(500));

        // rearmed from the jump, not from the backlog
        assert!(spawner.poll(ms(3_600_099)).is_empty());
        assert_eq!(spawner.poll(ms(3_600_100)).len(), 1);
    }

    #[test]
    fn test_catch_up_within_limit_is_exact() {
        let mut cfg = config(vec![variant(EntityKind::Normal, 100)]);
        cfg.max_catch_up = 5;
        let mut spawner = Spawner::new(cfg, 1);
        spawner.start(Duration::ZERO);

        assert_eq!(spawner.poll(ms(500)).len(), 5);
        assert_eq!(spawner.poll(ms(1_000)).len(), 5);
    }

    #[test]
    fn test_non_positive_period_is_clamped() {
        assert_eq!(clamp_period(0), MIN_SPAWN_PERIOD);
        assert_eq!(clamp_period(-20), MIN_SPAWN_PERIOD);
        assert_eq!(clamp_period(250), ms(250));

        let mut spawner = Spawner::new(config(vec![variant(EntityKind::Normal, 0)]), 1);
        spawner.start(Duration::ZERO);
        assert_eq!(spawner.poll(ms(10)).len(), 10);
    }

    #[test]
    fn test_requests_stay_in_bounds() {
        let mut spawner = Spawner::new(config(vec![variant(EntityKind::Normal, 10)]), 3);
        spawner.start(Duration::ZERO);

        let requests: Vec<SpawnRequest> =
            (1..=200).flat_map(|i| spawner.poll(ms(i * 10))).collect();
        assert_eq!(requests.len(), 200);
        for r in requests {
            assert!((-5.0..=5.0).contains(&r.position[0]));
            assert!((-5.0..=5.0).contains(&r.position[2]));
            assert_eq!(r.position[1], 30.0);
            assert!(r.velocity[0].abs() <= 0.5 && r.velocity[2].abs() <= 0.5);
            assert_eq!(r.velocity[1], 0.0);
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let run = |seed| {
            let mut spawner = Spawner::new(config(vec![variant(EntityKind::Normal, 100)]), seed);
            spawner.start(Duration::ZERO);
            spawner.poll(ms(1_000))
        };
        assert_eq!(run(42), run(42));
        assert_ne!(run(42), run(43));
    }

    #[test]
    fn test_reset_reseeds() {
        let mut spawner = Spawner::new(config(vec![variant(EntityKind::Normal, 100)]), 9);
        spawner.start(Duration::ZERO);
        let first = spawner.poll(ms(500));

        spawner.reset();
        assert_eq!(spawner.spawned(), 0);
        spawner.start(Duration::ZERO);
        assert_eq!(spawner.poll(ms(500)), first);
    }

    #[test]
    fn test_weighted_variants_share_a_trigger() {
        let mut heavy = variant(EntityKind::Special, 100);
        heavy.weight = 3.0;
        let mut spawner =
            Spawner::new(config(vec![variant(EntityKind::Normal, 100), heavy]), 11);
        assert_eq!(spawner.periods(), vec![ms(100)]);

        spawner.start(Duration::ZERO);
        let requests: Vec<SpawnRequest> =
            (1..=1_000).flat_map(|i| spawner.poll(ms(i * 100))).collect();
        assert_eq!(requests.len(), 1_000);
        let special = requests.iter().filter(|r| r.kind == EntityKind::Special).count();
        assert!((650..=850).contains(&special), "special = {special}");
    }
}
