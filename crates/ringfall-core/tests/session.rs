use std::time::Duration;

use ringfall_core::{
    Clock, EntityKind, GameConfig, GameEvent, GamePhase, HeadlessScene, ManualClock, RecordingDisplay,
    Session, ZoneId,
};

type TestSession = Session<HeadlessScene, RecordingDisplay>;

fn setup(config: GameConfig) -> (TestSession, ManualClock, RecordingDisplay) {
    let clock = ManualClock::new();
    let display = RecordingDisplay::new();
    let session = Session::new(config, clock.clone(), HeadlessScene::new(), display.clone())
        .expect("valid config");
    (session, clock, display)
}

/// Runs `frames` frames, advancing the clock one physics step before each.
fn run(session: &mut TestSession, clock: &ManualClock, frames: usize) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for _ in 0..frames {
        clock.advance_frame();
        events.extend(session.frame());
    }
    events
}

fn count(events: &[GameEvent], pred: impl Fn(&GameEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

#[test]
fn test_ring_pass_scores_exactly_once() {
    let (mut session, clock, display) = setup(GameConfig::ring_toss());
    let id = session.spawn_at(EntityKind::Normal, [0.0, 10.0, 0.0]);

    // three seconds: through the ring and down onto the floor
    let events = run(&mut session, &clock, 180);

    assert_eq!(session.score(), 1);
    assert_eq!(count(&events, |e| matches!(e, GameEvent::Scored { .. })), 1);
    let entity = session.registry().get(id).expect("ring does not remove");
    assert!(entity.has_scored());
    assert!(entity.transform.height() < 1.0);
    assert_eq!(display.last_score().as_deref(), Some("Score: 1"));
}

#[test]
fn test_ring_follows_moved_zone() {
    let (mut session, clock, _) = setup(GameConfig::ring_toss());
    session.move_zone(ZoneId(0), [4.0, 5.0, 4.0]).unwrap();
    session.spawn_at(EntityKind::Normal, [0.0, 10.0, 0.0]);
    session.spawn_at(EntityKind::Normal, [4.0, 10.0, 4.0]);

    run(&mut session, &clock, 180);

    assert_eq!(session.score(), 1);
    let scored: Vec<bool> = session.registry().iter().map(|e| e.has_scored()).collect();
    assert_eq!(scored, vec![false, true]);
}

#[test]
fn test_basket_scores_and_removes_same_tick() {
    let (mut session, _, _) = setup(GameConfig::basket_drop());
    let id = session.spawn_at(EntityKind::Normal, [0.0, 0.0, 0.0]);

    let events = session.tick();

    assert_eq!(session.score(), 1);
    assert!(session.registry().get(id).is_none());
    assert_eq!(session.scene().node_count(), 0);
    assert!(matches!(
        events.as_slice(),
        [GameEvent::Captured { delta: 1, total: 1, .. }]
    ));
}

#[test]
fn test_missed_special_is_penalized() {
    let (mut session, clock, _) = setup(GameConfig::ring_toss());
    session.spawn_at(EntityKind::Normal, [0.0, 4.0, 0.0]);
    session.spawn_at(EntityKind::Special, [6.0, 3.0, 6.0]);

    let events = run(&mut session, &clock, 180);

    assert_eq!(count(&events, |e| matches!(e, GameEvent::Penalized { .. })), 1);
    // 1 - 3 clamps at zero
    assert_eq!(session.score(), 0);
}

#[test]
fn test_spawn_count_over_ten_seconds() {
    let (mut session, clock, _) = setup(GameConfig::ring_toss());
    session.start();

    let mut events = Vec::new();
    while clock.now() < Duration::from_secs(10) {
        clock.advance_frame();
        events.extend(session.frame());
    }

    let normal = count(&events, |e| {
        matches!(e, GameEvent::Spawned { kind: EntityKind::Normal, .. })
    });
    let special = count(&events, |e| {
        matches!(e, GameEvent::Spawned { kind: EntityKind::Special, .. })
    });
    assert!((19..=20).contains(&normal), "normal = {normal}");
    assert_eq!(special, 2);
    assert_eq!(session.entity_count(), normal + special);
}

#[test]
fn test_double_start_keeps_one_schedule() {
    let (mut session, clock, _) = setup(GameConfig::basket_drop());
    assert!(session.start());
    clock.advance_ms(250);
    assert!(!session.start());

    clock.advance_ms(750);
    let events = session.frame();

    assert_eq!(count(&events, |e| matches!(e, GameEvent::Spawned { .. })), 2);
}

#[test]
fn test_stop_freezes_everything_but_physics() {
    let (mut session, clock, _) = setup(GameConfig::basket_drop());
    session.start();
    run(&mut session, &clock, 60);
    session.stop();
    let spawned = session.spawner().spawned();
    let elapsed = session.elapsed();

    let events = run(&mut session, &clock, 120);

    assert_eq!(count(&events, |e| matches!(e, GameEvent::Spawned { .. })), 0);
    assert_eq!(session.spawner().spawned(), spawned);
    assert_eq!(session.elapsed(), elapsed);
    assert_eq!(session.phase(), GamePhase::Idle);
}

#[test]
fn test_stop_then_reset_clears_session() {
    let (mut session, clock, display) = setup(GameConfig::ring_toss());
    session.start();
    // two specials and two normals through the ring, one normal outside it
    session.spawn_at(EntityKind::Special, [-0.5, 4.0, 0.0]);
    session.spawn_at(EntityKind::Special, [0.5, 4.0, 0.0]);
    session.spawn_at(EntityKind::Normal, [0.0, 4.0, 0.5]);
    session.spawn_at(EntityKind::Normal, [0.0, 4.0, -0.5]);
    session.spawn_at(EntityKind::Normal, [4.0, 2.0, 4.0]);
    clock.advance_frame();
    session.frame();
    session.stop();

    assert_eq!(session.entity_count(), 5);
    assert_eq!(session.score(), 12);

    session.reset();

    assert_eq!(session.entity_count(), 0);
    assert_eq!(session.scene().node_count(), 0);
    assert_eq!(session.score(), 0);
    assert_eq!(session.elapsed(), Duration::ZERO);
    assert_eq!(session.phase(), GamePhase::Idle);
    assert_eq!(display.last_score().as_deref(), Some("Score: 0"));
    assert_eq!(display.last_timer().as_deref(), Some("Time: 00:00"));
    assert_eq!(session.zone(ZoneId(0)).unwrap().feedback(), None);
}

#[test]
fn test_timer_accumulates_across_stop_and_start() {
    let (mut session, clock, display) = setup(GameConfig::basket_drop());
    session.start();
    clock.advance_ms(1_500);
    session.frame();
    session.stop();

    clock.advance_ms(10_000);
    assert_eq!(session.elapsed(), Duration::from_millis(1_500));

    session.start();
    clock.advance_ms(500);
    session.frame();

    assert_eq!(session.elapsed(), Duration::from_secs(2));
    assert_eq!(display.last_timer().as_deref(), Some("Time: 02:00"));
}

#[test]
fn test_expiry_ends_game_once() {
    let (mut session, clock, display) = setup(GameConfig::ring_toss());
    session.start();

    let events = run(&mut session, &clock, 61 * 60);

    assert_eq!(count(&events, |e| matches!(e, GameEvent::Ended { .. })), 1);
    assert_eq!(display.endings().len(), 1);
    assert_eq!(session.phase(), GamePhase::Ended);
    assert_eq!(session.elapsed(), Duration::from_secs(60));
    assert_eq!(display.last_timer().as_deref(), Some("Time: 60:00"));

    // nothing spawns once the game has ended
    let late = run(&mut session, &clock, 120);
    assert_eq!(count(&late, |e| matches!(e, GameEvent::Spawned { .. })), 0);
}

#[test]
fn test_restart_after_expiry() {
    let mut config = GameConfig::basket_drop();
    config.timer.limit_ms = Some(1_000);
    let (mut session, clock, display) = setup(config);
    session.start();
    run(&mut session, &clock, 90);
    assert_eq!(session.phase(), GamePhase::Ended);

    assert!(session.start());
    clock.advance_ms(200);
    session.frame();

    assert_eq!(session.phase(), GamePhase::Running);
    assert_eq!(session.elapsed(), Duration::from_millis(200));
    assert_eq!(display.endings().len(), 1);
}

#[test]
fn test_same_seed_same_game() {
    let play = || {
        let (mut session, clock, _) = setup(GameConfig::ring_toss());
        session.start();
        run(&mut session, &clock, 600);
        (session.score(), session.physics().compute_hash())
    };
    assert_eq!(play(), play());
}
