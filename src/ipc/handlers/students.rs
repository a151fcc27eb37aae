use serde_json::Value;

use super::{create_record, delete_record, get_record, update_record};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{optional_str, required_id, to_json};
use crate::ipc::types::{AppState, Request};

async fn handle_list(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let term = optional_str(params, "search").unwrap_or("");
    to_json(&state.gradebook.search_students(term).await?)
}

async fn handle_detail(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = required_id(params, "studentId")?;
    to_json(&state.gradebook.student_detail(student_id).await?)
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let store = state.gradebook.students.as_ref();
    let p = &req.params;
    let result = match req.method.as_str() {
        "students.list" => handle_list(state, p).await,
        "students.get" => get_record(store, p, "studentId").await,
        "students.create" => create_record(store, p).await,
        "students.update" => update_record(store, p, "studentId").await,
        "students.delete" => delete_record(store, p, "studentId").await,
        "students.detail" => handle_detail(state, p).await,
        _ => return None,
    };
    Some(respond(&req.id, result))
}
