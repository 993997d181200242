use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use devops_console::core::entities::CommandResult;
use devops_console::core::HistoryStore;
use std::fs;
use tempfile::TempDir;

fn record(name: &str, minutes: i64) -> CommandResult {
    let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    let mut result = CommandResult::new(name, &[], base + ChronoDuration::minutes(minutes));
    result.success = true;
    result.output = Some(format!("{} done", name));
    result
}

fn json_files(temp: &TempDir) -> usize {
    fs::read_dir(temp.path())
        .unwrap()
        .flatten()
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
        .count()
}

#[test]
fn test_list_is_newest_first_by_embedded_timestamp() {
    let temp = TempDir::new().unwrap();
    let store = HistoryStore::new(temp.path());

    // Saved out of chronological order.
    store.save(&record("trivy-fs", 5)).unwrap();
    store.save(&record("help", 1)).unwrap();
    store.save(&record("jenkins-jobs", 9)).unwrap();

    let commands: Vec<String> = store
        .list(0)
        .unwrap()
        .into_iter()
        .map(|r| r.command)
        .collect();
    assert_eq!(commands, vec!["jenkins-jobs", "trivy-fs", "help"]);
}

#[test]
fn test_list_applies_limit() {
    let temp = TempDir::new().unwrap();
    let store = HistoryStore::new(temp.path());
    for minute in 0..5 {
        store.save(&record(&format!("cmd-{}", minute), minute)).unwrap();
    }

    let recent = store.list(2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].command, "cmd-4");
    assert_eq!(recent[1].command, "cmd-3");
    assert_eq!(store.list(0).unwrap().len(), 5);
}

#[test]
fn test_same_second_saves_do_not_overwrite() {
    let temp = TempDir::new().unwrap();
    let store = HistoryStore::new(temp.path());

    let first = store.save(&record("sonar-gate", 0)).unwrap();
    let second = store.save(&record("sonar-gate", 0)).unwrap();
    let third = store.save(&record("sonar-gate", 0)).unwrap();

    assert_ne!(first, second);
    assert_ne!(second, third);
    assert_eq!(json_files(&temp), 3);
    assert_eq!(store.list(0).unwrap().len(), 3);
}

#[test]
fn test_file_names_follow_unix_seconds() {
    let temp = TempDir::new().unwrap();
    let store = HistoryStore::new(temp.path());
    let before = Utc::now().timestamp();
    let path = store.save(&record("help", 0)).unwrap();
    let after = Utc::now().timestamp();

    let name = path.file_name().unwrap().to_str().unwrap();
    let seconds: i64 = name
        .trim_start_matches("command-")
        .trim_end_matches(".json")
        .split('-')
        .next()
        .unwrap()
        .parse()
        .unwrap();
    assert!((before..=after).contains(&seconds));
}

#[test]
fn test_save_creates_missing_directory() {
    let temp = TempDir::new().unwrap();
    let store = HistoryStore::new(temp.path().join("nested").join("history"));
    store.save(&record("help", 0)).unwrap();
    assert_eq!(store.list(0).unwrap().len(), 1);
}

#[test]
fn test_retention_keeps_newest_records() {
    let temp = TempDir::new().unwrap();
    let store = HistoryStore::new(temp.path()).with_max_entries(3);

    for minute in 0..6 {
        store.save(&record(&format!("cmd-{}", minute), minute)).unwrap();
    }

    assert_eq!(json_files(&temp), 3);
    let commands: Vec<String> = store
        .list(0)
        .unwrap()
        .into_iter()
        .map(|r| r.command)
        .collect();
    assert_eq!(commands, vec!["cmd-5", "cmd-4", "cmd-3"]);
}

#[test]
fn test_zero_max_entries_keeps_everything() {
    let temp = TempDir::new().unwrap();
    let store = HistoryStore::new(temp.path()).with_max_entries(0);
    for minute in 0..4 {
        store.save(&record("help", minute)).unwrap();
    }
    assert_eq!(store.prune().unwrap(), 0);
    assert_eq!(json_files(&temp), 4);
}

#[test]
fn test_unparsable_files_are_skipped_and_never_pruned() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("command-1.json"), "{ not json").unwrap();
    fs::write(temp.path().join("README.txt"), "ignored").unwrap();

    let store = HistoryStore::new(temp.path()).with_max_entries(2);
    assert!(store.list(0).unwrap().is_empty());

    store.save(&record("a", 0)).unwrap();
    store.save(&record("b", 1)).unwrap();
    store.save(&record("c", 2)).unwrap();

    assert!(temp.path().join("command-1.json").exists());
    assert!(temp.path().join("README.txt").exists());
    let names: Vec<String> = store.list(0).unwrap().into_iter().map(|r| r.command).collect();
    assert_eq!(names, vec!["c", "b"]);
}

#[test]
fn test_empty_record_from_concurrent_writer_survives_retention() {
    let temp = TempDir::new().unwrap();
    let store = HistoryStore::new(temp.path()).with_max_entries(2);
    store.save(&record("a", 0)).unwrap();

    // Another writer has claimed the name but not yet filled it in.
    let in_flight = temp
        .path()
        .join(format!("command-{}-9.json", Utc::now().timestamp()));
    fs::write(&in_flight, "").unwrap();

    store.save(&record("b", 1)).unwrap();
    store.save(&record("c", 2)).unwrap();

    assert!(in_flight.exists());
    assert_eq!(store.list(0).unwrap().len(), 2);
    let leftovers = fs::read_dir(temp.path())
        .unwrap()
        .flatten()
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
        .count();
    assert_eq!(leftovers, 0);
}
