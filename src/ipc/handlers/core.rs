use crate::fixtures::load_fixture_dir;
use crate::gradebook::Gradebook;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let fixtures = match load_fixture_dir(&path) {
        Ok(f) => f,
        Err(e) => return err(&req.id, "workspace_load_failed", format!("{e:#}"), None),
    };
    let counts = json!({
        "students": fixtures.students.len(),
        "classes": fixtures.classes.len(),
        "assignments": fixtures.assignments.len(),
        "grades": fixtures.grades.len(),
        "attendance": fixtures.attendance.len(),
    });
    match Gradebook::seeded(fixtures, state.config.latency) {
        Ok(book) => {
            state.gradebook = book;
            state.workspace = Some(path.clone());
            tracing::info!(path = %path.display(), "workspace loaded");
            ok(
                &req.id,
                json!({ "workspacePath": path.to_string_lossy(), "counts": counts }),
            )
        }
        Err(e) => err(&req.id, "workspace_load_failed", e.to_string(), None),
    }
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.load" => Some(handle_workspace_load(state, req)),
        _ => None,
    }
}
