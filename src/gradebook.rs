//! The engine's entry point for the presentation layer: one store per entity
//! plus the joined views and upsert workflows the dashboard screens use.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::calc::{
    attendance_rate, attendance_tally, class_average, grade_percentage, round_off_1_decimal,
    student_attendance_rate, student_average, AttendanceTally, Metric,
};
use crate::dashboard::{build_recent_activity, build_stats, Dashboard};
use crate::error::{EngineError, Result};
use crate::fixtures::Fixtures;
use crate::join::{class_roster, filter_by_foreign_key};
use crate::model::{Assignment, Attendance, AttendanceStatus, Class, Grade, Student};
use crate::store::{merge_partial, EntityStore, Latency, MemoryStore, Partial, Record};
use crate::validate::{check_grade_score, Validate};

pub const RECENT_GRADES_SHOWN: usize = 5;
pub const RECENT_ATTENDANCE_SHOWN: usize = 10;
pub const UNKNOWN_ASSIGNMENT: &str = "Unknown Assignment";

pub struct Gradebook {
    pub students: Arc<dyn EntityStore<Student>>,
    pub classes: Arc<dyn EntityStore<Class>>,
    pub assignments: Arc<dyn EntityStore<Assignment>>,
    pub grades: Arc<dyn EntityStore<Grade>>,
    pub attendance: Arc<dyn EntityStore<Attendance>>,
    /// Held across read-check-write sequences that guard a uniqueness rule.
    grade_writes: Mutex<()>,
    attendance_writes: Mutex<()>,
}

/// Validate the merged record before handing the patch to the store.
pub async fn create_checked<T>(store: &dyn EntityStore<T>, partial: Partial) -> Result<T>
where
    T: Record + Validate,
{
    let draft = merge_partial(&T::default(), &partial)?;
    draft.validate()?;
    store.create(partial).await
}

pub async fn update_checked<T>(store: &dyn EntityStore<T>, id: i64, partial: Partial) -> Result<T>
where
    T: Record + Validate,
{
    let existing = store.get_by_id(id).await?;
    let draft = merge_partial(&existing, &partial)?;
    draft.validate()?;
    store.update(id, partial).await
}

fn to_partial(value: serde_json::Value) -> Partial {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Partial::new(),
    }
}

pub fn matches_search(student: &Student, term: &str) -> bool {
    if term.trim().is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    if student.full_name().to_lowercase().contains(&needle) {
        return true;
    }
    if let Some(level) = student.grade_level {
        if level.as_str().to_lowercase().contains(&needle) {
            return true;
        }
    }
    student
        .email
        .as_deref()
        .map(|e| e.to_lowercase().contains(&needle))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRow {
    #[serde(flatten)]
    pub class: Class,
    pub student_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridAssignment {
    pub assignment_id: i64,
    pub name: String,
    pub max_score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub assignment_id: i64,
    pub grade_id: Option<i64>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRow {
    pub student_id: i64,
    pub display_name: String,
    pub cells: Vec<GridCell>,
    pub average: Metric,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeGrid {
    pub class: Class,
    pub assignments: Vec<GridAssignment>,
    pub rows: Vec<GridRow>,
    pub class_average: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    pub student_id: i64,
    pub display_name: String,
    pub record_id: Option<i64>,
    pub status: Option<AttendanceStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSheet {
    pub class: Class,
    pub date: NaiveDate,
    pub rows: Vec<SheetRow>,
    pub tally: AttendanceTally,
    pub attendance_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeEntry {
    #[serde(flatten)]
    pub grade: Grade,
    pub assignment_name: Option<String>,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub grade_id: i64,
    pub date: Option<NaiveDate>,
    pub assignment_name: String,
    pub score: f64,
    pub max_score: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDetail {
    pub student: Student,
    pub average: Metric,
    pub attendance_rate: Metric,
    pub recent_grades: Vec<GradeEntry>,
    pub recent_attendance: Vec<Attendance>,
    pub trend: Vec<TrendPoint>,
}

fn assignment_name(assignments: &[Assignment], grade: &Grade) -> Option<String> {
    let id = grade.assignment_id.id()?;
    assignments
        .iter()
        .find(|a| a.id == id)
        .map(|a| a.name.clone())
}

impl Gradebook {
    pub fn in_memory(latency: Latency) -> Self {
        Gradebook::from_stores(
            Arc::new(MemoryStore::new(latency)),
            Arc::new(MemoryStore::new(latency)),
            Arc::new(MemoryStore::new(latency)),
            Arc::new(MemoryStore::new(latency)),
            Arc::new(MemoryStore::new(latency)),
        )
    }

    pub fn seeded(fixtures: Fixtures, latency: Latency) -> Result<Self> {
        Ok(Gradebook::from_stores(
            Arc::new(MemoryStore::seeded(fixtures.students, latency)?),
            Arc::new(MemoryStore::seeded(fixtures.classes, latency)?),
            Arc::new(MemoryStore::seeded(fixtures.assignments, latency)?),
            Arc::new(MemoryStore::seeded(fixtures.grades, latency)?),
            Arc::new(MemoryStore::seeded(fixtures.attendance, latency)?),
        ))
    }

    /// Build on any backends that honor the store contract.
    pub fn from_stores(
        students: Arc<dyn EntityStore<Student>>,
        classes: Arc<dyn EntityStore<Class>>,
        assignments: Arc<dyn EntityStore<Assignment>>,
        grades: Arc<dyn EntityStore<Grade>>,
        attendance: Arc<dyn EntityStore<Attendance>>,
    ) -> Self {
        Gradebook {
            students,
            classes,
            assignments,
            grades,
            attendance,
            grade_writes: Mutex::new(()),
            attendance_writes: Mutex::new(()),
        }
    }

    pub async fn search_students(&self, term: &str) -> Result<Vec<Student>> {
        let students = self.students.get_all().await?;
        Ok(students
            .into_iter()
            .filter(|s| matches_search(s, term))
            .collect())
    }

    pub async fn class_rows(&self) -> Result<Vec<ClassRow>> {
        let classes = self.classes.get_all().await?;
        Ok(classes
            .into_iter()
            .map(|class| ClassRow {
                student_count: class.student_ids.ids().len(),
                class,
            })
            .collect())
    }

    pub async fn class_roster(&self, class_id: i64) -> Result<Vec<Student>> {
        let (class, students) =
            tokio::try_join!(self.classes.get_by_id(class_id), self.students.get_all())?;
        Ok(class_roster(&class, &students).into_iter().cloned().collect())
    }

    pub async fn assignments_for(&self, class_id: Option<i64>) -> Result<Vec<Assignment>> {
        let all = self.assignments.get_all().await?;
        let Some(class_id) = class_id else {
            return Ok(all);
        };
        Ok(filter_by_foreign_key(&all, |a| &a.class_id, class_id)
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn grades_for(
        &self,
        class_id: Option<i64>,
        student_id: Option<i64>,
    ) -> Result<Vec<Grade>> {
        let mut grades = self.grades.get_all().await?;
        if let Some(class_id) = class_id {
            grades = filter_by_foreign_key(&grades, |g| &g.class_id, class_id)
                .into_iter()
                .cloned()
                .collect();
        }
        if let Some(student_id) = student_id {
            grades = filter_by_foreign_key(&grades, |g| &g.student_id, student_id)
                .into_iter()
                .cloned()
                .collect();
        }
        Ok(grades)
    }

    pub async fn attendance_for(
        &self,
        class_id: Option<i64>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Attendance>> {
        let mut records = self.attendance.get_all().await?;
        if let Some(class_id) = class_id {
            records = filter_by_foreign_key(&records, |a| &a.class_id, class_id)
                .into_iter()
                .cloned()
                .collect();
        }
        if let Some(date) = date {
            records.retain(|a| a.date == Some(date));
        }
        Ok(records)
    }

    pub async fn grade_grid(&self, class_id: i64) -> Result<GradeGrid> {
        let (class, students, assignments, grades) = tokio::try_join!(
            self.classes.get_by_id(class_id),
            self.students.get_all(),
            self.assignments.get_all(),
            self.grades.get_all(),
        )?;
        let roster = class_roster(&class, &students);
        let class_assignments = filter_by_foreign_key(&assignments, |a| &a.class_id, class_id);
        let class_grades = filter_by_foreign_key(&grades, |g| &g.class_id, class_id);

        let rows = roster
            .iter()
            .map(|s| {
                let own: Vec<&Grade> = class_grades
                    .iter()
                    .copied()
                    .filter(|g| g.student_id.id() == Some(s.id))
                    .collect();
                let cells = class_assignments
                    .iter()
                    .map(|a| {
                        let hit = own.iter().find(|g| g.assignment_id.id() == Some(a.id));
                        GridCell {
                            assignment_id: a.id,
                            grade_id: hit.map(|g| g.id),
                            score: hit.map(|g| g.score),
                        }
                    })
                    .collect();
                GridRow {
                    student_id: s.id,
                    display_name: s.full_name(),
                    cells,
                    average: student_average(own).rounded(),
                }
            })
            .collect();

        Ok(GradeGrid {
            assignments: class_assignments
                .iter()
                .map(|a| GridAssignment {
                    assignment_id: a.id,
                    name: a.name.clone(),
                    max_score: a.max_score,
                })
                .collect(),
            rows,
            class_average: round_off_1_decimal(class_average(class_grades.iter().copied())),
            class,
        })
    }

    /// Enter a score for one (student, assignment) cell of a class's grid.
    /// Updates the existing grade for that cell or creates one.
    pub async fn record_grade(
        &self,
        student_id: i64,
        class_id: i64,
        assignment_id: i64,
        score: f64,
        date: NaiveDate,
    ) -> Result<Grade> {
        let (assignment, class, students) = tokio::try_join!(
            self.assignments.get_by_id(assignment_id),
            self.classes.get_by_id(class_id),
            self.students.get_all(),
        )?;
        if !students.iter().any(|s| s.id == student_id) {
            return Err(EngineError::NotFound {
                entity: Student::ENTITY,
                id: student_id,
            });
        }
        // Cells exist only for the class's own assignments and roster.
        if assignment.class_id.id() != Some(class_id) {
            return Err(EngineError::invalid(format!(
                "assignment {} does not belong to class {}",
                assignment_id, class_id
            )));
        }
        if !class_roster(&class, &students)
            .iter()
            .any(|s| s.id == student_id)
        {
            return Err(EngineError::invalid(format!(
                "student {} is not enrolled in class {}",
                student_id, class_id
            )));
        }
        check_grade_score(score, assignment.max_score)?;

        let partial = to_partial(json!({
            "studentId": student_id,
            "classId": class_id,
            "assignmentId": assignment_id,
            "score": score,
            "maxScore": assignment.max_score,
            "date": date,
        }));
        let draft: Grade = merge_partial(&Grade::default(), &partial)?;
        draft.validate()?;

        let _guard = self.grade_writes.lock().await;
        let grades = self.grades.get_all().await?;
        let existing = grades.iter().find(|g| {
            g.student_id.id() == Some(student_id)
                && g.class_id.id() == Some(class_id)
                && g.assignment_id.id() == Some(assignment_id)
        });
        let saved = match existing {
            Some(g) => self.grades.update(g.id, partial).await?,
            None => self.grades.create(partial).await?,
        };
        tracing::info!(student_id, assignment_id, score, grade_id = saved.id, "grade recorded");
        Ok(saved)
    }

    fn find_slot_conflict(
        records: &[Attendance],
        draft: &Attendance,
        except_id: Option<i64>,
    ) -> Result<()> {
        let Some(slot) = draft.slot() else {
            return Ok(());
        };
        let clash = records
            .iter()
            .any(|r| Some(r.id) != except_id && r.slot() == Some(slot));
        if clash {
            let (student_id, class_id, date) = slot;
            return Err(EngineError::invalid(format!(
                "attendance already recorded for student {} in class {} on {}",
                student_id, class_id, date
            )));
        }
        Ok(())
    }

    /// Create an attendance record, refusing a second record for the same
    /// (student, class, date).
    pub async fn create_attendance(&self, partial: Partial) -> Result<Attendance> {
        let draft = merge_partial(&Attendance::default(), &partial)?;
        draft.validate()?;
        let _guard = self.attendance_writes.lock().await;
        let records = self.attendance.get_all().await?;
        Self::find_slot_conflict(&records, &draft, None)?;
        self.attendance.create(partial).await
    }

    pub async fn update_attendance(&self, id: i64, partial: Partial) -> Result<Attendance> {
        let _guard = self.attendance_writes.lock().await;
        let records = self.attendance.get_all().await?;
        let existing = records
            .iter()
            .find(|r| r.id == id)
            .ok_or(EngineError::NotFound {
                entity: Attendance::ENTITY,
                id,
            })?;
        let draft = merge_partial(existing, &partial)?;
        draft.validate()?;
        Self::find_slot_conflict(&records, &draft, Some(id))?;
        self.attendance.update(id, partial).await
    }

    /// Set a student's status for a class session, updating the session's
    /// record when one exists.
    pub async fn mark_attendance(
        &self,
        student_id: i64,
        class_id: i64,
        date: NaiveDate,
        status: AttendanceStatus,
        notes: Option<String>,
    ) -> Result<Attendance> {
        tokio::try_join!(
            self.students.get_by_id(student_id),
            self.classes.get_by_id(class_id),
        )?;

        let mut patch = json!({
            "studentId": student_id,
            "classId": class_id,
            "date": date,
            "status": status,
        });
        if let Some(notes) = notes {
            patch["notes"] = json!(notes);
        }
        let partial = to_partial(patch);

        let _guard = self.attendance_writes.lock().await;
        let records = self.attendance.get_all().await?;
        let existing = records
            .iter()
            .find(|r| r.slot() == Some((student_id, class_id, date)));
        let saved = match existing {
            Some(r) => self.attendance.update(r.id, partial).await?,
            None => self.attendance.create(partial).await?,
        };
        tracing::debug!(student_id, class_id, %date, status = status.as_str(), "attendance marked");
        Ok(saved)
    }

    pub async fn mark_all_present(&self, class_id: i64, date: NaiveDate) -> Result<Vec<Attendance>> {
        let roster = self.class_roster(class_id).await?;
        let mut saved = Vec::with_capacity(roster.len());
        for s in &roster {
            saved.push(
                self.mark_attendance(s.id, class_id, date, AttendanceStatus::Present, None)
                    .await?,
            );
        }
        tracing::info!(class_id, %date, marked = saved.len(), "marked all present");
        Ok(saved)
    }

    pub async fn attendance_sheet(&self, class_id: i64, date: NaiveDate) -> Result<AttendanceSheet> {
        let (class, students, records) = tokio::try_join!(
            self.classes.get_by_id(class_id),
            self.students.get_all(),
            self.attendance.get_all(),
        )?;
        let roster = class_roster(&class, &students);
        let session: Vec<&Attendance> = filter_by_foreign_key(&records, |a| &a.class_id, class_id)
            .into_iter()
            .filter(|a| a.date == Some(date))
            .collect();

        let rows = roster
            .iter()
            .map(|s| {
                let hit = session.iter().find(|a| a.student_id.id() == Some(s.id));
                SheetRow {
                    student_id: s.id,
                    display_name: s.full_name(),
                    record_id: hit.map(|a| a.id),
                    status: hit.and_then(|a| a.status),
                    notes: hit.and_then(|a| a.notes.clone()),
                }
            })
            .collect();

        Ok(AttendanceSheet {
            date,
            rows,
            tally: attendance_tally(roster.len(), session.iter().copied()),
            attendance_rate: round_off_1_decimal(attendance_rate(session.iter().copied())),
            class,
        })
    }

    pub async fn student_detail(&self, student_id: i64) -> Result<StudentDetail> {
        let (student, grades, records, assignments) = tokio::try_join!(
            self.students.get_by_id(student_id),
            self.grades.get_all(),
            self.attendance.get_all(),
            self.assignments.get_all(),
        )?;
        let own_grades = filter_by_foreign_key(&grades, |g| &g.student_id, student_id);
        let mut own_attendance: Vec<Attendance> =
            filter_by_foreign_key(&records, |a| &a.student_id, student_id)
                .into_iter()
                .cloned()
                .collect();

        let average = student_average(own_grades.iter().copied()).rounded();
        let attendance = student_attendance_rate(&own_attendance).rounded();

        let mut recent_grades: Vec<GradeEntry> = own_grades
            .iter()
            .map(|g| GradeEntry {
                grade: (*g).clone(),
                assignment_name: assignment_name(&assignments, g),
                percentage: grade_percentage(g).ok().map(round_off_1_decimal),
            })
            .collect();
        recent_grades.sort_by(|a, b| b.grade.date.cmp(&a.grade.date));
        recent_grades.truncate(RECENT_GRADES_SHOWN);

        own_attendance.sort_by(|a, b| b.date.cmp(&a.date));
        own_attendance.truncate(RECENT_ATTENDANCE_SHOWN);

        let mut trend: Vec<TrendPoint> = own_grades
            .iter()
            .filter_map(|g| {
                let percentage = grade_percentage(g).ok()?;
                Some(TrendPoint {
                    grade_id: g.id,
                    date: g.date,
                    assignment_name: assignment_name(&assignments, g)
                        .unwrap_or_else(|| UNKNOWN_ASSIGNMENT.to_string()),
                    score: g.score,
                    max_score: g.max_score,
                    percentage: round_off_1_decimal(percentage),
                })
            })
            .collect();
        trend.sort_by(|a, b| a.date.cmp(&b.date));

        Ok(StudentDetail {
            student,
            average,
            attendance_rate: attendance,
            recent_grades,
            recent_attendance: own_attendance,
            trend,
        })
    }

    pub async fn dashboard(&self, today: NaiveDate, activity_limit: usize) -> Result<Dashboard> {
        let (students, classes, grades, attendance) = tokio::try_join!(
            self.students.get_all(),
            self.classes.get_all(),
            self.grades.get_all(),
            self.attendance.get_all(),
        )?;
        let mut stats = build_stats(&students, &classes, &grades, &attendance, today);
        stats.average_grade = round_off_1_decimal(stats.average_grade);
        stats.attendance_rate = round_off_1_decimal(stats.attendance_rate);
        let recent_activity =
            build_recent_activity(&grades, &attendance, &students, today, activity_limit)
                .iter()
                .collect();
        Ok(Dashboard {
            today,
            stats,
            recent_activity,
        })
    }
}
