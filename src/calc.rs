use serde::{Serialize, Serializer};

use crate::error::{EngineError, Result};
use crate::model::{Attendance, AttendanceStatus, Grade};

/// Label shown where a per-student figure has no data behind it.
pub const NOT_AVAILABLE: &str = "N/A";

/// 1-decimal display rounding: `floor(10*x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

/// A percentage that may have no data behind it.
///
/// Serializes as a number, or as the string `"N/A"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric {
    NotAvailable,
    Percent(f64),
}

impl Metric {
    pub fn rounded(self) -> Metric {
        match self {
            Metric::NotAvailable => Metric::NotAvailable,
            Metric::Percent(v) => Metric::Percent(round_off_1_decimal(v)),
        }
    }
}

impl From<Option<f64>> for Metric {
    fn from(v: Option<f64>) -> Self {
        v.map(Metric::Percent).unwrap_or(Metric::NotAvailable)
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Metric::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
            Metric::Percent(v) => serializer.serialize_f64(*v),
        }
    }
}

pub fn grade_validity(score: f64, max_score: f64) -> bool {
    score.is_finite() && max_score.is_finite() && score >= 0.0 && score <= max_score
}

pub fn grade_percentage(grade: &Grade) -> Result<f64> {
    if !grade.max_score.is_finite() || grade.max_score <= 0.0 {
        return Err(EngineError::invalid(format!(
            "maxScore must be positive, got {}",
            grade.max_score
        )));
    }
    Ok(100.0 * grade.score / grade.max_score)
}

/// Mean percentage over the grades that have one. Grades with an unusable
/// maxScore count in neither the sum nor the denominator.
fn mean_percentage<'a, I>(grades: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a Grade>,
{
    let mut sum = 0.0_f64;
    let mut denom: usize = 0;
    for g in grades {
        let Ok(pct) = grade_percentage(g) else {
            continue;
        };
        sum += pct;
        denom += 1;
    }
    if denom > 0 {
        Some(sum / (denom as f64))
    } else {
        None
    }
}

/// Average for one student's grades; `N/A` when there are none.
pub fn student_average<'a, I>(grades: I) -> Metric
where
    I: IntoIterator<Item = &'a Grade>,
{
    mean_percentage(grades).into()
}

/// Average across a class's grades; 0 when there are none. Unlike
/// [`student_average`] this never reports `N/A`.
pub fn class_average<'a, I>(grades: I) -> f64
where
    I: IntoIterator<Item = &'a Grade>,
{
    mean_percentage(grades).unwrap_or(0.0)
}

fn present_ratio<'a, I>(records: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a Attendance>,
{
    let mut total: usize = 0;
    let mut present: usize = 0;
    for r in records {
        total += 1;
        if r.is_present() {
            present += 1;
        }
    }
    if total > 0 {
        Some(100.0 * (present as f64) / (total as f64))
    } else {
        None
    }
}

/// Share of records marked present; 100 when there are no records.
pub fn attendance_rate<'a, I>(records: I) -> f64
where
    I: IntoIterator<Item = &'a Attendance>,
{
    present_ratio(records).unwrap_or(100.0)
}

/// Attendance rate on the student detail view, which shows `N/A` rather than
/// the optimistic 100 when nothing has been recorded.
pub fn student_attendance_rate<'a, I>(records: I) -> Metric
where
    I: IntoIterator<Item = &'a Attendance>,
{
    present_ratio(records).into()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceTally {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub late: usize,
    pub unmarked: usize,
}

/// Count statuses for one class session. `roster_size` is the number of
/// students expected, so unmarked students show up as the remainder.
pub fn attendance_tally<'a, I>(roster_size: usize, records: I) -> AttendanceTally
where
    I: IntoIterator<Item = &'a Attendance>,
{
    let mut tally = AttendanceTally {
        total: roster_size,
        ..AttendanceTally::default()
    };
    for r in records {
        match r.status {
            Some(AttendanceStatus::Present) => tally.present += 1,
            Some(AttendanceStatus::Absent) => tally.absent += 1,
            Some(AttendanceStatus::Late) => tally.late += 1,
            None => {}
        }
    }
    tally.unmarked = roster_size.saturating_sub(tally.present + tally.absent + tally.late);
    tally
}
