//! Crash Recovery Tests
//!
//! A session must never be left `running` on disk once its handle is gone,
//! whether the handle was closed, dropped, or lost with its process.

use expflow::{
    Config, ExperimentRecord, ParticipantProfile, RecordKey, Registry, Status, Tracked, Trial,
};

fn setup(dir: &tempfile::TempDir) -> Registry {
    let registry = Registry::open(&Config::builder().base_dir(dir.path()).build()).unwrap();
    registry
        .create_participant("p01", ParticipantProfile::new())
        .unwrap()
        .close()
        .unwrap();
    registry
}

fn trials(n: u32) -> Vec<Trial> {
    (0..n).map(|i| Trial::builder().trial_number(i).build()).collect()
}

#[test]
fn test_scope_exit_while_running_leaves_paused() {
    let dir = tempfile::tempdir().unwrap();
    let registry = setup(&dir);

    {
        let mut experiment = registry.create_experiment("p01", "stroop", trials(3)).unwrap();
        experiment.advance().unwrap();
        experiment.advance().unwrap();
        assert!(experiment.is_running());
    }

    let experiment = registry.load_experiment("p01", "stroop").unwrap();
    assert!(experiment.is_paused());
    assert_eq!(experiment.trial_index(), Some(1));
    assert_eq!(experiment.trials()[0].status(), Status::Finished);
    assert_eq!(experiment.trials()[1].status(), Status::Paused);
    assert_eq!(experiment.trials()[2].status(), Status::Pending);
}

#[test]
fn test_close_while_running_leaves_paused() {
    let dir = tempfile::tempdir().unwrap();
    let registry = setup(&dir);

    let mut experiment = registry.create_experiment("p01", "stroop", trials(2)).unwrap();
    experiment.advance().unwrap();
    experiment.close().unwrap();

    let mut experiment = registry.load_experiment("p01", "stroop").unwrap();
    assert!(experiment.is_paused());
    let last = experiment.status_history().last().copied().unwrap();
    assert_eq!((last.from(), last.to()), (Status::Running, Status::Paused));

    // Resumable from where it stopped.
    assert_eq!(experiment.advance().unwrap().index(), Some(0));
    assert_eq!(experiment.advance().unwrap().index(), Some(1));
    assert!(experiment.advance().unwrap().is_exhausted());
    assert!(experiment.is_finished());
}

#[test]
fn test_release_of_pending_experiment_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let registry = setup(&dir);

    registry
        .create_experiment("p01", "stroop", trials(2))
        .unwrap()
        .close()
        .unwrap();
    let experiment = registry.load_experiment("p01", "stroop").unwrap();
    assert!(experiment.is_pending());
    assert!(experiment.status_history().is_empty());
}

#[test]
fn test_hard_crash_record_is_reconciled_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let registry = setup(&dir);

    // A killed process never runs its release; forgetting the handle
    // leaves exactly what the last save wrote.
    let mut experiment = registry.create_experiment("p01", "stroop", trials(3)).unwrap();
    experiment.advance().unwrap();
    std::mem::forget(experiment);

    let key = RecordKey::experiment("p01", "stroop");
    let (codec, bytes) = registry.store().read(&key).unwrap().unwrap();
    let on_disk: ExperimentRecord = expflow::store::decode_record(codec, &bytes).unwrap();
    assert!(on_disk.is_running());

    let experiment = registry.load_experiment("p01", "stroop").unwrap();
    assert!(experiment.is_paused());
    assert!(experiment.current_trial().unwrap().is_paused());
    drop(experiment);

    let (codec, bytes) = registry.store().read(&key).unwrap().unwrap();
    let on_disk: ExperimentRecord = expflow::store::decode_record(codec, &bytes).unwrap();
    assert!(on_disk.is_paused());
}

#[test]
fn test_delete_removes_record_for_good() {
    let dir = tempfile::tempdir().unwrap();
    let registry = setup(&dir);

    let mut experiment = registry.create_experiment("p01", "stroop", trials(2)).unwrap();
    experiment.advance().unwrap();
    experiment.delete().unwrap();

    assert!(!registry.experiment_exists("p01", "stroop").unwrap());
    assert!(registry.participated_in("p01").unwrap().is_empty());
    // The id is free again.
    registry
        .create_experiment("p01", "stroop", trials(1))
        .unwrap()
        .close()
        .unwrap();
}
