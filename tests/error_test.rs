//! Tests for error types

use expflow::{Error, Status};

#[test]
fn test_participant_exists_error() {
    let error = Error::ParticipantExists {
        participant_id: "p01".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Participant p01 already exists"));
    assert!(error_str.contains("Load the existing participant"));
}

#[test]
fn test_participant_does_not_exist_error() {
    let error = Error::ParticipantDoesNotExist {
        participant_id: "p_missing".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("p_missing does not exist"));
    assert!(error_str.contains("Create the participant"));
}

#[test]
fn test_experiment_exists_error() {
    let error = Error::ExperimentExists {
        participant_id: "p01".to_string(),
        experiment_id: "stroop".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("p01"));
    assert!(error_str.contains("stroop"));
    assert!(error_str.contains("can never be repeated"));
}

#[test]
fn test_record_not_found_error() {
    let error = Error::RecordNotFound {
        key: "experiment p01.stroop".to_string(),
    };
    assert_eq!(format!("{error}"), "Record not found: experiment p01.stroop");
}

#[test]
fn test_invalid_transition_error() {
    let error = Error::invalid_transition(Status::Finished, Status::Running);
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid status transition"));
    assert!(error_str.contains("finished -> running"));
}

#[test]
fn test_sequence_mutation_error() {
    let error = Error::SequenceMutation("iteration has started (trial_index = 0)".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Trial sequence is frozen"));
    assert!(error_str.contains("trial_index = 0"));
}

#[test]
fn test_type_mismatch_error() {
    let error = Error::TypeMismatch {
        expected: "experiment".to_string(),
        found: "participant".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("expected experiment record"));
    assert!(error_str.contains("found participant"));
}

#[test]
fn test_invalid_id_error() {
    let error = Error::InvalidId("p.1".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("\"p.1\""));
    assert!(error_str.contains("[A-Za-z0-9_-]"));
}

#[test]
fn test_no_current_trial_error() {
    let error_str = format!("{}", Error::NoCurrentTrial);
    assert!(error_str.contains("iteration has not started"));
}

#[test]
fn test_storage_error() {
    let error = Error::StorageError("gzip decompression failed".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Storage error"));
    assert!(error_str.contains("gzip decompression failed"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
    let error: Error = io_error.into();
    assert!(matches!(error, Error::Io(_)));
    assert!(format!("{error}").contains("IO error"));
}

#[test]
fn test_serialization_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(matches!(error, Error::Serialization(_)));
    assert!(format!("{error}").contains("Serialization error"));
}
