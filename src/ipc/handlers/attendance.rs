use serde_json::Value;

use super::{delete_record, get_record};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{
    date_or_today, optional_date, optional_id, optional_str, required_id, required_object,
    to_json,
};
use crate::ipc::types::{AppState, Request};
use crate::model::AttendanceStatus;

fn parse_status(params: &Value) -> Result<AttendanceStatus, HandlerErr> {
    let raw = params
        .get("status")
        .cloned()
        .ok_or_else(|| HandlerErr::bad_params("missing status"))?;
    serde_json::from_value(raw)
        .map_err(|_| HandlerErr::bad_params("status must be Present, Absent or Late"))
}

async fn handle_list(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = optional_id(params, "classId")?;
    let date = optional_date(params, "date")?;
    to_json(&state.gradebook.attendance_for(class_id, date).await?)
}

async fn handle_create(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let record = required_object(params, "record")?;
    to_json(&state.gradebook.create_attendance(record).await?)
}

async fn handle_update(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_id(params, "attendanceId")?;
    let patch = required_object(params, "patch")?;
    to_json(&state.gradebook.update_attendance(id, patch).await?)
}

async fn handle_sheet(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = required_id(params, "classId")?;
    let date = date_or_today(params, "date")?;
    to_json(&state.gradebook.attendance_sheet(class_id, date).await?)
}

async fn handle_mark(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = required_id(params, "studentId")?;
    let class_id = required_id(params, "classId")?;
    let date = date_or_today(params, "date")?;
    let status = parse_status(params)?;
    let notes = optional_str(params, "notes").map(str::to_string);
    let saved = state
        .gradebook
        .mark_attendance(student_id, class_id, date, status, notes)
        .await?;
    to_json(&saved)
}

async fn handle_mark_all_present(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = required_id(params, "classId")?;
    let date = date_or_today(params, "date")?;
    let saved = state.gradebook.mark_all_present(class_id, date).await?;
    Ok(serde_json::json!({ "marked": saved.len(), "records": to_json(&saved)? }))
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let store = state.gradebook.attendance.as_ref();
    let p = &req.params;
    let result = match req.method.as_str() {
        "attendance.list" => handle_list(state, p).await,
        "attendance.get" => get_record(store, p, "attendanceId").await,
        "attendance.create" => handle_create(state, p).await,
        "attendance.update" => handle_update(state, p).await,
        "attendance.delete" => delete_record(store, p, "attendanceId").await,
        "attendance.sheet" => handle_sheet(state, p).await,
        "attendance.mark" => handle_mark(state, p).await,
        "attendance.markAllPresent" => handle_mark_all_present(state, p).await,
        _ => return None,
    };
    Some(respond(&req.id, result))
}
