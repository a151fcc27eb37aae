use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn fixture_path(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(rel)
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_classtrackd");
    let mut child = Command::new(exe)
        .env("CLASSTRACKD_LATENCY", "none")
        .env_remove("CLASSTRACKD_FIXTURES")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn classtrackd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

#[test]
fn marking_the_same_session_twice_keeps_one_record() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "load",
        "workspace.load",
        json!({ "path": fixture_path("fixtures/sample").to_string_lossy() }),
    );

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.mark",
        json!({ "studentId": 4, "classId": 2, "date": "2024-09-30", "status": "Absent", "notes": "dentist" }),
    );
    let second = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.mark",
        json!({ "studentId": { "Id": 4 }, "classId": "2", "date": "2024-09-30", "status": "Late" }),
    );
    assert_eq!(first["Id"], second["Id"]);
    assert_eq!(second["status"], json!("Late"));
    assert_eq!(second["notes"], json!("dentist"));

    let session = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.list",
        json!({ "classId": 2, "date": "2024-09-30" }),
    );
    assert_eq!(session.as_array().map(|a| a.len()), Some(1));

    let bad_status = request(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.mark",
        json!({ "studentId": 4, "classId": 2, "date": "2024-09-30", "status": "Sick" }),
    );
    assert_eq!(error_code(&bad_status), "bad_params");

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn create_and_update_refuse_a_second_record_for_a_session() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "load",
        "workspace.load",
        json!({ "path": fixture_path("fixtures/sample").to_string_lossy() }),
    );

    let dup = request(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.create",
        json!({ "record": { "studentId": 1, "classId": 1, "date": "2024-09-23", "status": "Absent" } }),
    );
    assert_eq!(error_code(&dup), "bad_params");

    let moved = request(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.update",
        json!({ "attendanceId": 3, "patch": { "studentId": 2 } }),
    );
    assert_eq!(error_code(&moved), "bad_params");

    let fresh = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.create",
        json!({ "record": { "studentId": 5, "classId": 3, "date": "2024-09-23", "status": "Present" } }),
    );
    assert_eq!(fresh["Id"], json!(6));

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.delete",
        json!({ "attendanceId": 6 }),
    );
    assert_eq!(deleted["deleted"], json!(true));
    let again = request(
        &mut stdin,
        &mut reader,
        "5",
        "attendance.delete",
        json!({ "attendanceId": 6 }),
    );
    assert_eq!(error_code(&again), "not_found");

    // Ids are never reused after a delete.
    let next = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "attendance.create",
        json!({ "record": { "studentId": 5, "classId": 3, "date": "2024-09-23", "status": "Late" } }),
    );
    assert_eq!(next["Id"], json!(7));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn mark_all_present_fills_the_sheet() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "load",
        "workspace.load",
        json!({ "path": fixture_path("fixtures/sample").to_string_lossy() }),
    );

    let before = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.sheet",
        json!({ "classId": 1, "date": "2024-09-23" }),
    );
    assert_eq!(before["tally"]["present"], json!(1));
    assert_eq!(before["tally"]["absent"], json!(1));
    assert_eq!(before["tally"]["late"], json!(1));

    let marked = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.markAllPresent",
        json!({ "classId": 1, "date": "2024-09-23" }),
    );
    assert_eq!(marked["marked"], json!(3));

    let after = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.sheet",
        json!({ "classId": 1, "date": "2024-09-23" }),
    );
    assert_eq!(after["tally"]["present"], json!(3));
    assert_eq!(after["attendanceRate"].as_f64(), Some(100.0));

    let missing = request(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.markAllPresent",
        json!({ "classId": 99 }),
    );
    assert_eq!(error_code(&missing), "not_found");

    drop(stdin);
    let _ = child.wait();
}
