use super::*;
use crate::agent::Action;
use crate::policy::{RandomPolicy, ScriptedPolicy, SeekerPolicy};
use crate::render::NullSink;
use std::io;

fn small_config() -> SimConfig {
    SimConfig {
        world_size: 10,
        vision_size: 3,
        reward_count: 0,
        tick_rate_hz: 0,
        start: [1, 1],
        seed: 5,
        ..SimConfig::default()
    }
}

fn scenario() -> Simulation<ScriptedPolicy> {
    let mut world = WorldGrid::new(10);
    world.place_reward(3, 3);
    let policy = ScriptedPolicy::from_actions(&[Action::Right, Action::Down]);
    Simulation::with_world(small_config(), world, policy).unwrap()
}

#[test]
fn reward_is_resolved_before_the_move() {
    let mut sim = scenario();
    let mut trajectory = Vec::new();
    let mut rewards = Vec::new();
    for _ in 0..5 {
        let frame = sim.step().unwrap();
        trajectory.push(frame.agent);
        rewards.push(frame.reward);
    }
    let expected: Vec<[usize; 2]> = vec![[2, 1], [2, 2], [3, 2], [3, 3]];
    assert_eq!(trajectory[..4].to_vec(), expected);
    // Arriving on (3,3) at the end of tick 3 is not rewarded until tick 4
    // resolves the cell the agent is standing on.
    assert_eq!(rewards, vec![0, 0, 0, 0, 1]);
    assert_eq!(sim.total_collected(), 1);
    assert_eq!(sim.world().reward_count(), 1);

    let summary = scenario().run_experiment(5, 5).unwrap();
    assert_eq!(summary.collection_ticks, vec![4]);
}

#[test]
fn frame_reports_resolved_cell_and_post_move_window() {
    let mut sim = scenario();
    let frame = sim.step().unwrap();
    assert_eq!(frame.tick, 0);
    assert_eq!(frame.resolved_at, [1, 1]);
    assert_eq!(frame.agent, [2, 1]);
    assert_eq!(frame.vision.origin, [1usize, 0]);
    assert_eq!(frame.action, Action::Right);
    assert_eq!(frame.reward_cells, vec![[3usize, 3]]);
    assert_eq!(frame.observation.size(), 3);
    assert_eq!(sim.phase(), TickPhase::PositionUpdated);
    assert_eq!(sim.tick(), 1);
}

#[test]
fn invalid_action_leaves_position_untouched() {
    let policy = ScriptedPolicy::new(vec![7]);
    let mut sim = Simulation::with_world(small_config(), WorldGrid::new(10), policy).unwrap();
    let err = sim.step().unwrap_err();
    assert!(matches!(
        err,
        SimError::InvalidAction(InvalidAction { code: 7 })
    ));
    assert_eq!(sim.agent().position, [1, 1]);
    assert_eq!(sim.tick(), 0);
    assert_eq!(sim.phase(), TickPhase::ActionChosen);
}

#[test]
fn failing_policy_is_fatal_to_the_tick() {
    let policy = ScriptedPolicy::new(Vec::new());
    let mut sim = Simulation::with_world(small_config(), WorldGrid::new(10), policy).unwrap();
    let err = sim.step().unwrap_err();
    assert!(matches!(err, SimError::PolicyUnavailable(_)));
    assert_eq!(sim.agent().position, [1, 1]);
    assert_eq!(sim.phase(), TickPhase::RewardResolved);
}

#[test]
fn identical_seeds_replay_identically() {
    let config = SimConfig {
        world_size: 16,
        vision_size: 5,
        reward_count: 30,
        tick_rate_hz: 0,
        seed: 99,
        ..SimConfig::default()
    };
    let mut a = Simulation::new(config.clone(), RandomPolicy::new(1)).unwrap();
    let mut b = Simulation::new(config, RandomPolicy::new(1)).unwrap();
    assert_eq!(a.world(), b.world());
    for _ in 0..300 {
        let fa = a.step().unwrap();
        let fb = b.step().unwrap();
        assert_eq!(fa.agent, fb.agent);
        assert_eq!(fa.reward_cells, fb.reward_cells);
        assert_eq!(fa.reward, fb.reward);
    }
}

#[test]
fn reward_count_is_conserved_across_ticks() {
    let config = SimConfig {
        world_size: 20,
        vision_size: 7,
        reward_count: 40,
        tick_rate_hz: 0,
        ..SimConfig::default()
    };
    let mut sim = Simulation::new(config, SeekerPolicy::new(3)).unwrap();
    let initial = sim.world().reward_count();
    assert!(initial > 0 && initial <= 40);
    for _ in 0..500 {
        let frame = sim.step().unwrap();
        assert_eq!(frame.reward_cells.len(), initial);
        assert_eq!(sim.world().reward_count(), initial);
    }
    assert!(sim.total_collected() > 0);
}

#[test]
fn exact_reward_count_places_every_draw() {
    let config = SimConfig {
        world_size: 10,
        vision_size: 3,
        reward_count: 60,
        exact_reward_count: true,
        ..SimConfig::default()
    };
    let sim = Simulation::new(config, RandomPolicy::new(0)).unwrap();
    assert_eq!(sim.world().reward_count(), 60);
}

#[test]
fn construction_validates_config_and_world() {
    let even = SimConfig {
        vision_size: 4,
        ..small_config()
    };
    assert!(matches!(
        Simulation::new(even, RandomPolicy::new(0)),
        Err(SimInitError::Config(SimConfigError::InvalidVisionSize(4)))
    ));
    assert!(matches!(
        Simulation::with_world(small_config(), WorldGrid::new(8), RandomPolicy::new(0)),
        Err(SimInitError::WorldSizeMismatch {
            expected: 10,
            actual: 8
        })
    ));
}

#[test]
fn run_honours_tick_limit_and_stop_flag() {
    let mut sim = Simulation::new(small_config(), RandomPolicy::new(2)).unwrap();
    let stop = AtomicBool::new(false);
    let mut count = 0u64;
    let mut sink = |_: &Frame| -> Result<(), RenderError> {
        count += 1;
        Ok(())
    };
    let outcome = sim.run(&stop, &mut sink, Some(5)).unwrap();
    assert_eq!(outcome.ticks, 5);
    assert_eq!(outcome.stopped_by, StopReason::TickLimit);
    assert_eq!(count, 5);
    assert_eq!(sim.phase(), TickPhase::Rendered);

    stop.store(true, Ordering::Relaxed);
    let outcome = sim.run(&stop, &mut NullSink, None).unwrap();
    assert_eq!(outcome.ticks, 0);
    assert_eq!(outcome.stopped_by, StopReason::Signal);
    assert_eq!(sim.tick(), 5);
}

#[test]
fn stop_requested_mid_run_finishes_the_current_tick() {
    let mut sim = Simulation::new(small_config(), RandomPolicy::new(2)).unwrap();
    let stop = AtomicBool::new(false);
    let mut sink = |frame: &Frame| -> Result<(), RenderError> {
        if frame.tick == 2 {
            stop.store(true, Ordering::Relaxed);
        }
        Ok(())
    };
    let outcome = sim.run(&stop, &mut sink, None).unwrap();
    assert_eq!(outcome.ticks, 3);
    assert_eq!(outcome.stopped_by, StopReason::Signal);
}

#[test]
fn sink_failure_ends_the_run() {
    let mut sim = Simulation::new(small_config(), RandomPolicy::new(2)).unwrap();
    let stop = AtomicBool::new(false);
    let mut sink =
        |_: &Frame| -> Result<(), RenderError> { Err(io::Error::other("display gone").into()) };
    let err = sim.run(&stop, &mut sink, Some(10)).unwrap_err();
    assert!(matches!(err, SimError::Render(RenderError::Io(_))));
    assert_eq!(sim.phase(), TickPhase::PositionUpdated);
}

#[test]
fn experiment_samples_on_schedule() {
    let mut sim = Simulation::new(small_config(), RandomPolicy::new(4)).unwrap();
    let summary = sim.run_experiment(10, 3).unwrap();
    let steps: Vec<usize> = summary.samples.iter().map(|s| s.step).collect();
    assert_eq!(steps, vec![3, 6, 9, 10]);
    assert_eq!(summary.steps, 10);
    assert_eq!(summary.initial_reward_count, summary.final_reward_count);
    assert_eq!(summary.final_position, sim.agent().position);

    let json = serde_json::to_string(&summary).unwrap();
    let back: RunSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(back, summary);
}

#[test]
fn experiment_reports_only_its_own_collections() {
    let config = SimConfig {
        reward_count: 100,
        exact_reward_count: true,
        ..small_config()
    };
    let mut sim = Simulation::new(config, RandomPolicy::new(6)).unwrap();
    assert!(sim.world().is_full());

    // Every tick on a full grid collects and respawns into the cleared cell.
    let stop = AtomicBool::new(false);
    let outcome = sim.run(&stop, &mut NullSink, Some(20_000)).unwrap();
    assert_eq!(outcome.total_collected, 20_000);
    assert!(sim.world().is_full());

    let summary = sim.run_experiment(3, 1).unwrap();
    assert_eq!(summary.collection_ticks, vec![20_000, 20_001, 20_002]);
    assert_eq!(summary.total_collected, 3);
    assert_eq!(sim.total_collected(), 20_003);
}

#[test]
fn experiment_rejects_bad_bounds() {
    let mut sim = Simulation::new(small_config(), RandomPolicy::new(4)).unwrap();
    assert!(matches!(
        sim.run_experiment(10, 0),
        Err(ExperimentError::InvalidSampleEvery)
    ));
    assert!(matches!(
        sim.run_experiment(Simulation::<RandomPolicy>::MAX_EXPERIMENT_STEPS + 1, 1),
        Err(ExperimentError::TooManySteps { .. })
    ));
    assert!(matches!(
        sim.run_experiment(100_000, 1),
        Err(ExperimentError::TooManySamples { .. })
    ));
}

#[test]
fn experiment_surfaces_tick_errors() {
    let policy = ScriptedPolicy::new(vec![0, 1, 9]);
    let mut sim = Simulation::with_world(small_config(), WorldGrid::new(10), policy).unwrap();
    let err = sim.run_experiment(5, 1).unwrap_err();
    assert!(matches!(
        err,
        ExperimentError::Tick(SimError::InvalidAction(InvalidAction { code: 9 }))
    ));
    assert_eq!(sim.tick(), 2);
}
