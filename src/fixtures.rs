use anyhow::Context;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::model::{Assignment, Attendance, Class, Grade, Student};

/// Seed data for every collection, as read from a fixture directory.
#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    pub students: Vec<Student>,
    pub classes: Vec<Class>,
    pub assignments: Vec<Assignment>,
    pub grades: Vec<Grade>,
    pub attendance: Vec<Attendance>,
}

fn read_collection<T: DeserializeOwned>(dir: &Path, file_name: &str) -> anyhow::Result<Vec<T>> {
    let path = dir.join(file_name);
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "fixture file absent, starting empty");
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("read fixture {}", path.display()))?;
    let records: Vec<T> = serde_json::from_str(&text)
        .with_context(|| format!("parse fixture {}", path.display()))?;
    Ok(records)
}

/// Load `students.json`, `classes.json`, `assignments.json`, `grades.json`
/// and `attendance.json` from `dir`. A missing file is an empty collection.
pub fn load_fixture_dir(dir: &Path) -> anyhow::Result<Fixtures> {
    if !dir.is_dir() {
        anyhow::bail!("fixture directory not found: {}", dir.display());
    }
    let fixtures = Fixtures {
        students: read_collection(dir, "students.json")?,
        classes: read_collection(dir, "classes.json")?,
        assignments: read_collection(dir, "assignments.json")?,
        grades: read_collection(dir, "grades.json")?,
        attendance: read_collection(dir, "attendance.json")?,
    };
    let dangling_grades = fixtures
        .grades
        .iter()
        .filter(|g| g.student_id.id().is_none() || g.assignment_id.id().is_none())
        .count();
    let dangling_attendance = fixtures
        .attendance
        .iter()
        .filter(|a| a.student_id.id().is_none() || a.class_id.id().is_none())
        .count();
    if dangling_grades + dangling_attendance > 0 {
        tracing::warn!(
            grades = dangling_grades,
            attendance = dangling_attendance,
            "records with unresolvable references will be left out of joins"
        );
    }
    tracing::info!(
        dir = %dir.display(),
        students = fixtures.students.len(),
        classes = fixtures.classes.len(),
        assignments = fixtures.assignments.len(),
        grades = fixtures.grades.len(),
        attendance = fixtures.attendance.len(),
        "fixtures loaded"
    );
    Ok(fixtures)
}
