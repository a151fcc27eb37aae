//! Method families. Each `try_handle` answers the methods it owns and
//! returns `None` for everything else.

pub mod assignments;
pub mod attendance;
pub mod classes;
pub mod core;
pub mod dashboard;
pub mod grades;
pub mod students;

use serde_json::{json, Value};

use crate::gradebook::{create_checked, update_checked};
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{required_id, required_object, to_json};
use crate::store::{EntityStore, Record};
use crate::validate::Validate;

async fn get_record<T: Record>(
    store: &dyn EntityStore<T>,
    params: &Value,
    id_key: &str,
) -> Result<Value, HandlerErr> {
    let id = required_id(params, id_key)?;
    to_json(&store.get_by_id(id).await?)
}

async fn create_record<T: Record + Validate>(
    store: &dyn EntityStore<T>,
    params: &Value,
) -> Result<Value, HandlerErr> {
    let record = required_object(params, "record")?;
    to_json(&create_checked(store, record).await?)
}

async fn update_record<T: Record + Validate>(
    store: &dyn EntityStore<T>,
    params: &Value,
    id_key: &str,
) -> Result<Value, HandlerErr> {
    let id = required_id(params, id_key)?;
    let patch = required_object(params, "patch")?;
    to_json(&update_checked(store, id, patch).await?)
}

async fn delete_record<T: Record>(
    store: &dyn EntityStore<T>,
    params: &Value,
    id_key: &str,
) -> Result<Value, HandlerErr> {
    let id = required_id(params, id_key)?;
    let deleted = store.delete(id).await?;
    Ok(json!({ "deleted": deleted }))
}
