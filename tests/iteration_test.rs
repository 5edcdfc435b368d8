//! Iteration Protocol Tests
//!
//! Drives experiments through the public handle the way an experiment
//! script would: advance, respond, check `is_running()`, repeat.

use std::thread;
use std::time::Duration;

use expflow::{Advance, Error, Experiment, ParticipantProfile, Registry, Status, Tracked, Trial};

fn setup(n: u32) -> (Registry, Experiment) {
    let registry = Registry::in_memory();
    registry
        .create_participant("p01", ParticipantProfile::new())
        .unwrap()
        .close()
        .unwrap();
    let trials = (0..n)
        .map(|i| {
            Trial::builder()
                .trial_number(i)
                .condition(if i % 2 == 0 { "congruent" } else { "incongruent" })
                .build()
        })
        .collect();
    let experiment = registry.create_experiment("p01", "stroop", trials).unwrap();
    (registry, experiment)
}

fn statuses(experiment: &Experiment) -> Vec<Status> {
    experiment.trials().iter().map(Tracked::status).collect()
}

#[test]
fn test_full_iteration_of_three_trials() {
    let (_registry, mut experiment) = setup(3);
    assert!(experiment.is_pending());

    let mut seen = Vec::new();
    while let Advance::Next { index, trial } = experiment.advance().unwrap() {
        assert!(trial.is_running());
        seen.push(index);
        assert!(experiment.is_running());
    }

    assert_eq!(seen, vec![0, 1, 2]);
    assert!(experiment.is_finished());
    assert_eq!(experiment.trial_index(), Some(2));
    assert_eq!(statuses(&experiment), vec![Status::Finished; 3]);
    assert!(experiment.duration().is_some());

    // Further advances are a no-op, not an error.
    assert!(experiment.advance().unwrap().is_exhausted());
    assert!(experiment.is_finished());

    let history: Vec<_> = experiment
        .status_history()
        .iter()
        .map(|change| (change.from(), change.to()))
        .collect();
    assert_eq!(
        history,
        vec![
            (Status::Pending, Status::Running),
            (Status::Running, Status::Finished)
        ]
    );
}

#[test]
fn test_pause_after_second_trial_resumes_in_place() {
    let (registry, mut experiment) = setup(5);

    experiment.advance().unwrap();
    thread::sleep(Duration::from_millis(50));
    experiment.advance().unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(experiment.advance().unwrap().index(), Some(2));

    experiment.pause().unwrap();
    assert!(!experiment.is_running());
    assert!(experiment.current_trial().unwrap().is_paused());
    experiment.close().unwrap();

    thread::sleep(Duration::from_millis(400));

    let mut experiment = registry.load_experiment("p01", "stroop").unwrap();
    assert!(experiment.is_paused());
    assert_eq!(experiment.trial_index(), Some(2));
    assert_eq!(experiment.advance().unwrap().index(), Some(2));
    assert!(experiment.is_running());

    let mut rest = Vec::new();
    while let Advance::Next { index, .. } = experiment.advance().unwrap() {
        rest.push(index);
    }
    assert_eq!(rest, vec![3, 4]);
    assert!(experiment.is_finished());

    let active = experiment.duration().unwrap();
    let wall = (experiment.ended_at().unwrap() - experiment.started_at().unwrap())
        .num_milliseconds() as f64
        / 1000.0;
    assert!(wall >= 0.5, "wall clock {wall}s should include the pause");
    assert!(active >= 0.1, "active {active}s should include both sleeps");
    assert!(
        active < wall - 0.35,
        "active {active}s should exclude the 0.4s pause (wall {wall}s)"
    );
    let timing = Tracked::lifecycle(&experiment).timing();
    assert_eq!(timing.pauses().len(), 1);
    assert!(timing.pause_total().num_milliseconds() >= 400);
}

#[test]
fn test_driving_loop_stops_on_time_out() {
    let (_registry, mut experiment) = setup(5);

    let mut presented = 0;
    loop {
        let Advance::Next { index, .. } = experiment.advance().unwrap() else {
            break;
        };
        presented += 1;
        experiment
            .record_response(serde_json::json!({ "rt_ms": 420 + index }))
            .unwrap();
        if index == 1 {
            experiment.time_out().unwrap();
        }
        if !experiment.is_running() {
            break;
        }
    }

    assert_eq!(presented, 2);
    assert!(experiment.is_timed_out());
    assert_eq!(
        statuses(&experiment),
        vec![
            Status::Finished,
            Status::TimedOut,
            Status::Skipped,
            Status::Skipped,
            Status::Skipped
        ]
    );
    assert!(experiment.advance().unwrap().is_exhausted());
    assert!(experiment.is_timed_out());
    assert_eq!(
        experiment.trials()[1].response(),
        Some(&serde_json::json!({ "rt_ms": 421 }))
    );
}

#[test]
fn test_trial_level_operations() {
    let (_registry, mut experiment) = setup(4);
    experiment.skip_trial(2).unwrap();

    assert_eq!(experiment.advance().unwrap().index(), Some(0));
    experiment.time_out_trial().unwrap();
    assert_eq!(experiment.advance().unwrap().index(), Some(1));
    experiment.finish_trial().unwrap();
    assert!(matches!(
        experiment.finish_trial(),
        Err(Error::InvalidTransition { .. })
    ));
    assert_eq!(experiment.advance().unwrap().index(), Some(3));
    assert!(experiment.advance().unwrap().is_exhausted());

    assert_eq!(
        statuses(&experiment),
        vec![
            Status::TimedOut,
            Status::Finished,
            Status::Skipped,
            Status::Finished
        ]
    );
}

#[test]
fn test_skip_and_pause_rules() {
    let (_registry, mut experiment) = setup(2);
    assert!(matches!(
        experiment.pause(),
        Err(Error::InvalidTransition {
            from: Status::Pending,
            to: Status::Paused
        })
    ));
    experiment.advance().unwrap();
    assert!(matches!(
        experiment.skip(),
        Err(Error::InvalidTransition {
            from: Status::Running,
            to: Status::Skipped
        })
    ));
    experiment.finish().unwrap();
    assert!(matches!(
        experiment.pause(),
        Err(Error::InvalidTransition { .. })
    ));
    assert_eq!(statuses(&experiment), vec![Status::Finished, Status::Skipped]);
}

#[test]
fn test_skip_pending_experiment() {
    let (_registry, mut experiment) = setup(3);
    experiment.skip().unwrap();
    assert!(experiment.is_skipped());
    assert!(experiment.duration().is_none());
    assert_eq!(statuses(&experiment), vec![Status::Skipped; 3]);
    assert!(experiment.advance().unwrap().is_exhausted());
}

#[test]
fn test_sequence_frozen_after_start() {
    let (_registry, mut experiment) = setup(3);
    experiment.insert_trial(0, Trial::builder().practice(true).build()).unwrap();
    experiment.reorder_trials(&[0, 3, 2, 1]).unwrap();
    let numbers: Vec<_> = experiment.trials().iter().map(Trial::trial_number).collect();
    assert_eq!(numbers, vec![None, Some(2), Some(1), Some(0)]);

    experiment.advance().unwrap();
    assert!(matches!(
        experiment.append_trial(Trial::new()),
        Err(Error::SequenceMutation(_))
    ));
    assert!(matches!(
        experiment.insert_trial(0, Trial::new()),
        Err(Error::SequenceMutation(_))
    ));
    assert!(matches!(
        experiment.reorder_trials(&[3, 2, 1, 0]),
        Err(Error::SequenceMutation(_))
    ));
    assert_eq!(experiment.trials().len(), 4);
}

#[test]
fn test_empty_experiment_finishes_on_first_advance() {
    let (_registry, mut experiment) = setup(0);
    assert!(experiment.advance().unwrap().is_exhausted());
    assert!(experiment.is_finished());
    assert!(experiment.trial_index().is_none());
}
