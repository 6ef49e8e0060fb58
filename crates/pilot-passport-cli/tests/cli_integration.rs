use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use pilot_passport_store_sqlite::fixture::{CareerDbFixture, FixtureSchema, PilotSeed, SortieSeed};
use serde_json::Value;
use tempfile::TempDir;

const MARTA: &str = "fullname=Marta%20Nowak&birthCountryInfo=102&birthDate=1920.12.1";
const MARTA_EARLIER: &str = "fullname=Marta%20Nowak&birthCountryInfo=102&birthDate=1920.12.1&v=0";

fn run_passport<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_passport"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|err| panic!("failed to execute passport binary: {err}"))
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    serde_json::from_str(&stdout)
        .unwrap_or_else(|err| panic!("stdout is not valid JSON: {err}\nstdout:\n{stdout}"))
}

fn run_json<I, S>(args: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = run_passport(args);
    if !output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "passport command failed (status={}):\nstdout:\n{}\nstderr:\n{}",
            output.status, stdout, stderr
        );
    }
    stdout_json(&output)
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap_or_else(|| panic!("path should be valid UTF-8: {}", path.display()))
}

/// A game installation laid out as `{root}/data/Career/cp.db`.
fn game_install() -> TempDir {
    let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("failed to create tempdir: {err}"));
    let career_dir = dir.path().join("data").join("Career");
    fs::create_dir_all(&career_dir)
        .unwrap_or_else(|err| panic!("failed to create {}: {err}", career_dir.display()));

    let seeded = CareerDbFixture::create(&career_dir.join("cp.db"), FixtureSchema::Current)
        .and_then(|db| {
            db.career(1, -1, 5)?.career(2, 1, 6)?;
            db.pilot(&PilotSeed {
                id: 5,
                description: MARTA_EARLIER.to_string(),
                ..PilotSeed::default()
            })?;
            db.pilot(&PilotSeed {
                id: 6,
                description: MARTA.to_string(),
                stats: vec![("sorties", 2.0), ("goodSorties", 1.0), ("flightTime", 5400.0)],
                ..PilotSeed::default()
            })?;
            db.sortie(&SortieSeed {
                pilot_id: 5,
                date: "1941.6.22".to_string(),
                model: Some("LuaScripts/WorldObjects/Planes/spitfiremkvb.txt".to_string()),
                mission_id: Some(1),
                flight_time: Some(5400.0),
                kills: vec![("killHeavyPlane", 1)],
            })?;
            db.mission(1, "intercept@2")?;
            Ok(())
        });
    if let Err(err) = seeded {
        panic!("failed to seed fixture database: {err:#}");
    }
    dir
}

#[test]
fn pilots_lists_lineage_under_the_game_path() {
    let game = game_install();
    let value = run_json(["pilots", "--game-path", path_str(game.path())]);

    assert_eq!(value.get("contract_version").and_then(Value::as_str), Some("cli.v1"));
    let payload = value.get("payload").and_then(Value::as_array).cloned().unwrap_or_default();
    assert_eq!(payload.len(), 1);
    assert_eq!(payload[0].get("display").and_then(Value::as_str), Some("Marta Nowak"));
    assert_eq!(payload[0].get("country").and_then(Value::as_str), Some("Great Britain"));
    assert_eq!(payload[0].get("pilot_id").and_then(Value::as_i64), Some(6));
    assert_eq!(payload[0].get("desc").and_then(Value::as_str), Some(MARTA));
}

#[test]
fn stats_keep_report_order_on_stdout() {
    let game = game_install();
    let value = run_json(["--game-path", path_str(game.path()), "stats", "--desc", MARTA_EARLIER]);

    let keys = value
        .get("payload")
        .and_then(Value::as_object)
        .map(|payload| payload.keys().cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    assert_eq!(keys, vec!["Flight Time", "Good Sorties", "Sorties", "Success Rate"]);
    assert_eq!(value.pointer("/payload/Flight Time").and_then(Value::as_str), Some("1h 30m"));
    assert_eq!(value.pointer("/payload/Success Rate").and_then(Value::as_str), Some("50.0%"));
}

#[test]
fn sorties_and_service_record_cover_the_lineage() {
    let game = game_install();
    let db = game.path().join("data").join("Career").join("cp.db");

    let sorties = run_json(["sorties", "--db", path_str(&db), "--desc", MARTA]);
    assert_eq!(sorties.pointer("/payload/0/aircraft").and_then(Value::as_str), Some("SPITFIREMKVB"));
    assert_eq!(sorties.pointer("/payload/0/mission_type").and_then(Value::as_str), Some("Intercept"));
    assert_eq!(sorties.pointer("/payload/0/flight_time").and_then(Value::as_str), Some("1h 30m"));
    assert_eq!(sorties.pointer("/payload/0/kills/Air kills").and_then(Value::as_i64), Some(1));

    let record = run_json(["service-record", "--db", path_str(&db), "--desc", MARTA]);
    assert_eq!(
        record.pointer("/payload/pilot_info/birth_date").and_then(Value::as_str),
        Some("1.12.1920")
    );
    assert_eq!(record.pointer("/payload/pilot_info/squadron").and_then(Value::as_str), Some("Unknown"));
    assert_eq!(record.pointer("/payload/pilot_info/rank_name").and_then(Value::as_str), Some("Unknown"));
}

#[test]
fn config_file_supplies_the_game_path() {
    let game = game_install();
    let config_dir = tempfile::tempdir().unwrap_or_else(|err| panic!("failed to create tempdir: {err}"));
    let config = config_dir.path().join("passport.json");
    let body = serde_json::json!({ "game_path": path_str(game.path()) }).to_string();
    fs::write(&config, body).unwrap_or_else(|err| panic!("failed to write config: {err}"));

    let value = run_json(["--config", path_str(&config), "pilots"]);
    assert_eq!(value.pointer("/payload/0/pilot_id").and_then(Value::as_i64), Some(6));
}

#[test]
fn unknown_descriptor_exits_with_not_found() {
    let game = game_install();
    let output =
        run_passport(["stats", "--game-path", path_str(game.path()), "--desc", "fullname=Nobody"]);
    assert_eq!(output.status.code(), Some(3));
    let value = stdout_json(&output);
    assert_eq!(value.pointer("/error/code").and_then(Value::as_str), Some("not_found"));
}

#[test]
fn missing_database_exits_with_source_unavailable() {
    let empty = tempfile::tempdir().unwrap_or_else(|err| panic!("failed to create tempdir: {err}"));
    let output = run_passport(["pilots", "--game-path", path_str(empty.path())]);
    assert_eq!(output.status.code(), Some(4));
    let value = stdout_json(&output);
    assert_eq!(value.pointer("/error/code").and_then(Value::as_str), Some("source_unavailable"));
}
