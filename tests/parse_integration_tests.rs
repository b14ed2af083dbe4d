//! Integration tests for the parse path: summary metadata and role extraction

mod common;

use common::*;
use mcap_export::{parse_log, ExportError, FieldRoles, ROLE_LATITUDE, ROLE_LONGITUDE};
use tempfile::TempDir;

fn position_roles() -> FieldRoles {
    FieldRoles::new(POSITION_TOPIC)
        .with_role(ROLE_LATITUDE, "position.lat")
        .with_role(ROLE_LONGITUDE, "position.lon")
}

#[test]
fn test_parse_without_roles() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log = temp_dir.path().join("drive.mcap");
    write_drive_log(&log);

    let result = parse_log(&log, None).unwrap();
    assert_eq!(result.source, log);
    assert_eq!(result.file_size, std::fs::metadata(&log).unwrap().len());
    assert_eq!(result.channels, vec![POSITION_TOPIC, "battery"]);
    assert_eq!(result.channel_count, 2);
    assert_eq!(result.start_time, Some(1_755_213_040.0));
    assert_eq!(result.end_time, Some(1_755_213_041.0));
    assert!((result.duration_seconds - 1.0).abs() < 1e-9);
    assert_eq!(result.formatted_date.as_deref(), Some("2025-08-14 23:10:40"));
    assert!(result.roles.is_empty());
    assert!(result.track.is_empty());
}

#[test]
fn test_parse_extracts_roles_and_track() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log = temp_dir.path().join("drive.mcap");
    write_drive_log(&log);

    let result = parse_log(&log, Some(&position_roles())).unwrap();
    assert_eq!(result.roles[ROLE_LATITUDE], "51.5");
    assert_eq!(result.roles[ROLE_LONGITUDE], "-0.125");

    // the third fix has non-numeric coordinates and is left out
    assert_eq!(result.track.len(), 2);
    assert_eq!(result.track[0].latitude, 51.5);
    assert_eq!(result.track[1].longitude, -0.25);
    assert_eq!(result.track[1].timestamp_ns, 1_755_213_040_500_000_000);
}

#[test]
fn test_single_role_skips_track() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log = temp_dir.path().join("drive.mcap");
    write_drive_log(&log);

    let roles = FieldRoles::new(POSITION_TOPIC).with_role("heading", "vectornav.yaw");
    let result = parse_log(&log, Some(&roles)).unwrap();
    assert_eq!(result.roles["heading"], "90.0");
    assert!(result.track.is_empty());
}

#[test]
fn test_unknown_role_path_fails_loudly() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log = temp_dir.path().join("drive.mcap");
    write_drive_log(&log);

    let roles = FieldRoles::new(POSITION_TOPIC).with_role(ROLE_LATITUDE, "position.latitude");
    let err = parse_log(&log, Some(&roles)).unwrap_err();
    match err {
        ExportError::RoleNotFound {
            role,
            path,
            channel,
        } => {
            assert_eq!(role, ROLE_LATITUDE);
            assert_eq!(path, "position.latitude");
            assert_eq!(channel, POSITION_TOPIC);
        }
        other => panic!("expected RoleNotFound, got {other:?}"),
    }
}

#[test]
fn test_absent_role_channel_is_not_an_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log = temp_dir.path().join("drive.mcap");
    write_drive_log(&log);

    let roles = FieldRoles::new("gps_fix").with_role(ROLE_LATITUDE, "lat");
    let result = parse_log(&log, Some(&roles)).unwrap();
    assert!(result.roles.is_empty());
    assert_eq!(result.channel_count, 2);
}

#[test]
fn test_truncated_container_has_no_summary() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log = temp_dir.path().join("drive.mcap");
    write_drive_log(&log);

    let bytes = std::fs::read(&log).unwrap();
    let truncated = temp_dir.path().join("truncated.mcap");
    std::fs::write(&truncated, &bytes[..bytes.len() / 2]).unwrap();

    let err = parse_log(&truncated, None).unwrap_err();
    assert!(matches!(err, ExportError::MissingSummary(_)));
}

#[test]
fn test_not_an_mcap_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let junk = temp_dir.path().join("junk.mcap");
    std::fs::write(&junk, b"hello").unwrap();

    assert!(matches!(
        parse_log(&junk, None),
        Err(ExportError::Corrupt { .. })
    ));
}

#[test]
fn test_role_channel_without_decodable_messages_fails() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log = temp_dir.path().join("gps.mcap");
    write_json_mcap(&log, &[(1, "gps", "{not json"), (2, "gps", "{still not")]);

    let roles = FieldRoles::new("gps").with_role(ROLE_LATITUDE, "no.such.path");
    match parse_log(&log, Some(&roles)) {
        Err(ExportError::RoleNotFound { role, path, .. }) => {
            assert_eq!(role, ROLE_LATITUDE);
            assert_eq!(path, "no.such.path");
        }
        other => panic!("expected RoleNotFound, got {other:?}"),
    }
}
