//! Error message tests

use std::path::PathBuf;

use zsc_eval::config::SweepConfig;
use zsc_eval::Error;

#[test]
fn test_missing_episode_message_names_policy() {
    let error = Error::MissingEpisode {
        episode_id: 17,
        dataset: "baseline".to_string(),
    };
    let message = format!("{error}");
    assert!(message.contains("Episode 17"));
    assert!(message.contains("baseline"));
    assert!(message.contains("skip"));
}

#[test]
fn test_empty_episode_message() {
    let error = Error::EmptyEpisode("42".to_string());
    let message = format!("{error}");
    assert!(message.contains("`42`"));
    assert!(message.contains("no samples"));
}

#[test]
fn test_decode_message_includes_path() {
    let error = Error::Decode {
        path: PathBuf::from("solo/ep3.bin"),
        message: "unexpected end".to_string(),
    };
    let message = format!("{error}");
    assert!(message.contains("solo/ep3.bin"));
    assert!(message.contains("unexpected end"));
}

#[test]
fn test_config_errors_are_reported_as_config() {
    let err = SweepConfig::from_json_str("{not json").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(format!("{err}").starts_with("Configuration error"));

    let err = SweepConfig::from_json_str(r#"{"solo": [], "experiments": {"a": ["x"]}}"#).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let error: Error = io.into();
    assert!(format!("{error}").contains("IO error"));
}
