use serde_json::Value;

use super::{create_record, delete_record, get_record, update_record};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{optional_id, to_json};
use crate::ipc::types::{AppState, Request};

async fn handle_list(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = optional_id(params, "classId")?;
    to_json(&state.gradebook.assignments_for(class_id).await?)
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let store = state.gradebook.assignments.as_ref();
    let p = &req.params;
    let result = match req.method.as_str() {
        "assignments.list" => handle_list(state, p).await,
        "assignments.get" => get_record(store, p, "assignmentId").await,
        "assignments.create" => create_record(store, p).await,
        "assignments.update" => update_record(store, p, "assignmentId").await,
        "assignments.delete" => delete_record(store, p, "assignmentId").await,
        _ => return None,
    };
    Some(respond(&req.id, result))
}
