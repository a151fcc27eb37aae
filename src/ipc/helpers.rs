use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::error::EngineError;
use crate::ipc::error::HandlerErr;
use crate::join::normalize_id_ref;
use crate::store::Partial;

fn present<'a>(params: &'a Value, key: &str) -> Option<&'a Value> {
    params.get(key).filter(|v| !v.is_null())
}

/// Ids arrive in any of the loose reference shapes.
pub fn required_id(params: &Value, key: &str) -> Result<i64, HandlerErr> {
    let Some(raw) = present(params, key) else {
        return Err(HandlerErr::bad_params(format!("missing {}", key)));
    };
    normalize_id_ref(raw).ok_or_else(|| {
        EngineError::MalformedReference {
            field: key.to_string(),
        }
        .into()
    })
}

pub fn optional_id(params: &Value, key: &str) -> Result<Option<i64>, HandlerErr> {
    match present(params, key) {
        None => Ok(None),
        Some(_) => required_id(params, key).map(Some),
    }
}

pub fn optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

pub fn required_f64(params: &Value, key: &str) -> Result<f64, HandlerErr> {
    let Some(raw) = present(params, key) else {
        return Err(HandlerErr::bad_params(format!("missing {}", key)));
    };
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a number", key)))
}

pub fn required_object(params: &Value, key: &str) -> Result<Partial, HandlerErr> {
    match params.get(key) {
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(HandlerErr::bad_params(format!("{} must be an object", key))),
        None => Err(HandlerErr::bad_params(format!("missing {}", key))),
    }
}

pub fn optional_date(params: &Value, key: &str) -> Result<Option<NaiveDate>, HandlerErr> {
    let Some(raw) = present(params, key) else {
        return Ok(None);
    };
    let text = raw
        .as_str()
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))?;
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map(Some)
        .map_err(|_| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))
}

pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn date_or_today(params: &Value, key: &str) -> Result<NaiveDate, HandlerErr> {
    Ok(optional_date(params, key)?.unwrap_or_else(local_today))
}

pub fn to_json<T: Serialize>(value: &T) -> Result<Value, HandlerErr> {
    serde_json::to_value(value).map_err(|e| HandlerErr {
        code: "internal",
        message: e.to_string(),
        details: None,
    })
}
