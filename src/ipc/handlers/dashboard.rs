use serde_json::Value;

use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{date_or_today, to_json};
use crate::ipc::types::{AppState, Request};

async fn handle_open(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let today = date_or_today(params, "today")?;
    let limit = match params.get("activityLimit") {
        None | Some(Value::Null) => state.config.activity_limit,
        Some(v) => v
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| HandlerErr::bad_params("activityLimit must be a non-negative integer"))?,
    };
    to_json(&state.gradebook.dashboard(today, limit).await?)
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "dashboard.open" => Some(respond(&req.id, handle_open(state, &req.params).await)),
        _ => None,
    }
}
