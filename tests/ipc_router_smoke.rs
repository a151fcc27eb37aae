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
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["ok"], json!(true));
    let loaded = request(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.load",
        json!({ "path": fixture_path("fixtures/sample").to_string_lossy() }),
    );
    assert_eq!(loaded["result"]["counts"]["students"], json!(6));

    let calls = [
        ("students.list", json!({})),
        ("students.get", json!({ "studentId": 1 })),
        ("students.detail", json!({ "studentId": "1" })),
        ("classes.list", json!({})),
        ("classes.get", json!({ "classId": 1 })),
        ("classes.roster", json!({ "classId": { "Id": 1 } })),
        ("assignments.list", json!({ "classId": 1 })),
        ("assignments.get", json!({ "assignmentId": 1 })),
        ("grades.list", json!({ "classId": 1 })),
        ("grades.get", json!({ "gradeId": 1 })),
        ("grid.open", json!({ "classId": 1 })),
        ("attendance.list", json!({ "date": "2024-09-23" })),
        ("attendance.get", json!({ "attendanceId": 1 })),
        ("attendance.sheet", json!({ "classId": 1, "date": "2024-09-23" })),
        ("dashboard.open", json!({ "today": "2024-09-23" })),
    ];
    for (i, (method, params)) in calls.into_iter().enumerate() {
        let id = format!("r{}", i);
        let resp = request(&mut stdin, &mut reader, &id, method, params);
        assert_eq!(resp["ok"], json!(true), "{} failed: {}", method, resp);
    }

    let unknown = request(&mut stdin, &mut reader, "u1", "seating.open", json!({}));
    assert_eq!(unknown["ok"], json!(false));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn unknown_methods_and_bad_lines_get_error_envelopes() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value["ok"], json!(false));
    assert_eq!(value["error"]["code"], json!("bad_json"));

    let payload = json!({ "id": "x1", "method": "reports.print", "params": {} });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush");
    line.clear();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value["id"], json!("x1"));
    assert_eq!(value["error"]["code"], json!("not_implemented"));

    let missing = request(&mut stdin, &mut reader, "x2", "students.get", json!({ "studentId": 42 }));
    assert_eq!(missing["error"]["code"], json!("not_found"));
    assert_eq!(missing["error"]["message"], json!("student not found: 42"));

    let malformed = request(&mut stdin, &mut reader, "x3", "grid.open", json!({ "classId": "abc" }));
    assert_eq!(malformed["error"]["code"], json!("bad_params"));

    drop(stdin);
    let _ = child.wait();
}
