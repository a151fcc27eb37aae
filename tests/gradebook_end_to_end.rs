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
fn two_grades_average_to_eighty_five_and_ungraded_student_is_na() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let class = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "classes.create",
        json!({ "record": { "name": "Period 3", "subject": "Physics", "studentIds": [] } }),
    );
    let class_id = class["Id"].as_i64().expect("class id");

    let mut student_ids = Vec::new();
    for (i, first) in ["Ana", "Ben"].iter().enumerate() {
        let s = request_ok(
            &mut stdin,
            &mut reader,
            &format!("s{}", i),
            "students.create",
            json!({ "record": {
                "firstName": first,
                "lastName": "Example",
                "gradeLevel": "11",
                "dateOfBirth": "2008-02-01",
                "classIds": [class_id]
            }}),
        );
        student_ids.push(s["Id"].as_i64().expect("student id"));
    }
    assert!(student_ids[1] > student_ids[0]);

    let mut assignment_ids = Vec::new();
    for (i, name) in ["Lab 1", "Lab 2"].iter().enumerate() {
        let a = request_ok(
            &mut stdin,
            &mut reader,
            &format!("a{}", i),
            "assignments.create",
            json!({ "record": { "name": name, "classId": class_id, "maxScore": 100 } }),
        );
        assignment_ids.push(a["Id"].as_i64().expect("assignment id"));
    }

    for (i, (assignment_id, score)) in assignment_ids.iter().zip([80, 90]).enumerate() {
        let g = request_ok(
            &mut stdin,
            &mut reader,
            &format!("g{}", i),
            "grades.record",
            json!({
                "studentId": student_ids[0],
                "classId": class_id,
                "assignmentId": assignment_id,
                "score": score,
                "date": "2024-10-01"
            }),
        );
        assert_eq!(g["maxScore"].as_f64(), Some(100.0));
    }

    let grid = request_ok(
        &mut stdin,
        &mut reader,
        "grid",
        "grid.open",
        json!({ "classId": class_id }),
    );
    let rows = grid["rows"].as_array().expect("rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["average"].as_f64(), Some(85.0));
    assert_eq!(rows[1]["average"], json!("N/A"));
    assert_eq!(grid["classAverage"].as_f64(), Some(85.0));

    let detail = request_ok(
        &mut stdin,
        &mut reader,
        "detail",
        "students.detail",
        json!({ "studentId": student_ids[1] }),
    );
    assert_eq!(detail["average"], json!("N/A"));
    assert_eq!(detail["attendanceRate"], json!("N/A"));

    let over = request(
        &mut stdin,
        &mut reader,
        "over",
        "grades.record",
        json!({
            "studentId": student_ids[1],
            "classId": class_id,
            "assignmentId": assignment_ids[0],
            "score": 101
        }),
    );
    assert_eq!(error_code(&over), "bad_params");
    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "list",
        "grades.list",
        json!({ "studentId": student_ids[1] }),
    );
    assert_eq!(listed.as_array().map(|a| a.len()), Some(0));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn recording_an_existing_cell_updates_in_place() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "load",
        "workspace.load",
        json!({ "path": fixture_path("fixtures/sample").to_string_lossy() }),
    );

    let g = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "grades.record",
        json!({ "studentId": "2", "classId": 1, "assignmentId": { "Id": 1 }, "score": "19" }),
    );
    assert_eq!(g["Id"], json!(2));
    assert_eq!(g["score"].as_f64(), Some(19.0));

    let all = request_ok(&mut stdin, &mut reader, "2", "grades.list", json!({}));
    assert_eq!(all.as_array().map(|a| a.len()), Some(6));

    let grid = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grid.open",
        json!({ "classId": 1 }),
    );
    let liam = grid["rows"]
        .as_array()
        .and_then(|rows| rows.iter().find(|r| r["studentId"] == json!(2)))
        .expect("liam row");
    assert_eq!(liam["average"].as_f64(), Some(95.0));

    // Assignment 1 is an Algebra I assignment; class 2 is Biology.
    let foreign = request(
        &mut stdin,
        &mut reader,
        "4",
        "grades.record",
        json!({ "studentId": 4, "classId": 2, "assignmentId": 1, "score": 0 }),
    );
    assert_eq!(error_code(&foreign), "bad_params");
    let biology = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "grid.open",
        json!({ "classId": 2 }),
    );
    assert_eq!(biology["classAverage"].as_f64(), Some(85.0));

    drop(stdin);
    let _ = child.wait();
}
