//! Foreign-key normalization and filter-joins.
//!
//! Upstream records reference each other in several shapes: a raw integer,
//! an embedded `{"Id": n, ...}` object, a comma-joined string or an array of
//! any of those. Everything is normalized here so aggregation code only ever
//! sees integer ids.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::model::{Class, Student};

/// Key used by embedded reference objects.
pub const ID_FIELD: &str = "Id";

fn positive(n: i64) -> Option<i64> {
    (n > 0).then_some(n)
}

fn parse_token(token: &str) -> Option<i64> {
    let t = token.trim();
    if t.is_empty() || !t.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    t.parse::<i64>().ok().and_then(positive)
}

fn number_id(n: &serde_json::Number) -> Option<i64> {
    if let Some(v) = n.as_i64() {
        return positive(v);
    }
    let f = n.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f >= 1.0 && f <= i64::MAX as f64 {
        return Some(f as i64);
    }
    None
}

/// Resolve a single reference. Strings yield their first comma-separated
/// token and arrays their first element.
pub fn normalize_id_ref(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => number_id(n),
        Value::String(s) => s.split(',').next().and_then(parse_token),
        Value::Object(obj) => obj.get(ID_FIELD).and_then(normalize_id_ref),
        Value::Array(items) => items.first().and_then(normalize_id_ref),
        Value::Null | Value::Bool(_) => None,
    }
}

/// Resolve every id a reference field mentions. Unparseable tokens and
/// elements are dropped; the rest survive.
pub fn normalize_id_set(value: &Value) -> BTreeSet<i64> {
    match value {
        Value::String(s) => s.split(',').filter_map(parse_token).collect(),
        Value::Array(items) => items.iter().filter_map(normalize_id_ref).collect(),
        other => normalize_id_ref(other).into_iter().collect(),
    }
}

/// A loosely-typed foreign-key field, kept as it arrived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdRef(Value);

impl IdRef {
    pub fn from_id(id: i64) -> Self {
        IdRef(Value::from(id))
    }

    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        IdRef(Value::Array(ids.into_iter().map(Value::from).collect()))
    }

    pub fn id(&self) -> Option<i64> {
        normalize_id_ref(&self.0)
    }

    pub fn ids(&self) -> BTreeSet<i64> {
        normalize_id_set(&self.0)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids().contains(&id)
    }
}

impl From<Value> for IdRef {
    fn from(value: Value) -> Self {
        IdRef(value)
    }
}

pub fn filter_by_foreign_key<'a, T, F>(records: &'a [T], field: F, target: i64) -> Vec<&'a T>
where
    F: Fn(&T) -> &IdRef,
{
    records
        .iter()
        .filter(|r| field(r).id() == Some(target))
        .collect()
}

pub fn filter_by_membership<'a, T, F>(records: &'a [T], field: F, target: i64) -> Vec<&'a T>
where
    F: Fn(&T) -> &IdRef,
{
    records.iter().filter(|r| field(r).contains(target)).collect()
}

/// Students enrolled in `class`, from either side of the relation.
pub fn class_roster<'a>(class: &Class, students: &'a [Student]) -> Vec<&'a Student> {
    let listed = class.student_ids.ids();
    let enrolled = filter_by_membership(students, |s| &s.class_ids, class.id);
    students
        .iter()
        .filter(|s| listed.contains(&s.id) || enrolled.iter().any(|e| e.id == s.id))
        .collect()
}
