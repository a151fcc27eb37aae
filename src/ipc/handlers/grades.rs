use serde_json::Value;

use super::{create_record, delete_record, get_record, update_record};
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{date_or_today, optional_id, required_f64, required_id, to_json};
use crate::ipc::types::{AppState, Request};

async fn handle_list(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = optional_id(params, "classId")?;
    let student_id = optional_id(params, "studentId")?;
    to_json(&state.gradebook.grades_for(class_id, student_id).await?)
}

async fn handle_record(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = required_id(params, "studentId")?;
    let class_id = required_id(params, "classId")?;
    let assignment_id = required_id(params, "assignmentId")?;
    let score = required_f64(params, "score")?;
    let date = date_or_today(params, "date")?;
    let grade = state
        .gradebook
        .record_grade(student_id, class_id, assignment_id, score, date)
        .await?;
    to_json(&grade)
}

async fn handle_grid_open(state: &AppState, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = required_id(params, "classId")?;
    to_json(&state.gradebook.grade_grid(class_id).await?)
}

pub async fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let store = state.gradebook.grades.as_ref();
    let p = &req.params;
    let result = match req.method.as_str() {
        "grades.list" => handle_list(state, p).await,
        "grades.get" => get_record(store, p, "gradeId").await,
        "grades.create" => create_record(store, p).await,
        "grades.update" => update_record(store, p, "gradeId").await,
        "grades.delete" => delete_record(store, p, "gradeId").await,
        "grades.record" => handle_record(state, p).await,
        "grid.open" => handle_grid_open(state, p).await,
        _ => return None,
    };
    Some(respond(&req.id, result))
}
