use serde_json::Value;

use super::{create_record, delete_record, get_record, update_record};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{required_id, to_json};
use crate::ipc::types::{AppState, Request};

async fn handle_list(state: &AppState) -> Result<Value, HandlerErr> {
    to_json(&state.gradebook.class_rows().await?)
}

async fn handle_roster(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = required_id(params, "classId")?;
    to_json(&state.gradebook.class_roster(class_id).await?)
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let store = state.gradebook.classes.as_ref();
    let p = &req.params;
    let result = match req.method.as_str() {
        "classes.list" => handle_list(state).await,
        "classes.get" => get_record(store, p, "classId").await,
        "classes.create" => create_record(store, p).await,
        "classes.update" => update_record(store, p, "classId").await,
        "classes.delete" => delete_record(store, p, "classId").await,
        "classes.roster" => handle_roster(state, p).await,
        _ => return None,
    };
    Some(respond(&req.id, result))
}
