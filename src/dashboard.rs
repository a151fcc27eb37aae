use chrono::NaiveDate;
use serde::Serialize;

use crate::calc::{attendance_rate, class_average};
use crate::model::{Attendance, Class, Grade, Student};

/// Grades surfaced in the activity feed, taken from the end of the
/// collection.
pub const RECENT_GRADE_COUNT: usize = 3;
/// Today's attendance records surfaced in the activity feed.
pub const RECENT_ATTENDANCE_COUNT: usize = 2;
pub const DEFAULT_ACTIVITY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_students: usize,
    pub total_classes: usize,
    pub average_grade: f64,
    pub attendance_rate: f64,
}

/// `average_grade` is the mean over every grade on record, not a mean of
/// per-student averages. `attendance_rate` looks at `today` only.
pub fn build_stats(
    students: &[Student],
    classes: &[Class],
    grades: &[Grade],
    attendance: &[Attendance],
    today: NaiveDate,
) -> DashboardStats {
    DashboardStats {
        total_students: students.len(),
        total_classes: classes.len(),
        average_grade: class_average(grades),
        attendance_rate: attendance_rate(attendance.iter().filter(|a| a.date == Some(today))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Grade,
    Attendance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub student_id: i64,
    pub message: String,
    pub time: &'static str,
    pub icon: &'static str,
}

fn find_student(students: &[Student], id: Option<i64>) -> Option<&Student> {
    let id = id?;
    students.iter().find(|s| s.id == id)
}

/// Borrowed view over the collections the activity feed is derived from.
///
/// Nothing is cached: each [`RecentActivity::iter`] call walks the inputs
/// again, so the feed can be restarted any number of times.
#[derive(Debug, Clone, Copy)]
pub struct RecentActivity<'a> {
    grades: &'a [Grade],
    attendance: &'a [Attendance],
    students: &'a [Student],
    today: NaiveDate,
    limit: usize,
}

impl<'a> RecentActivity<'a> {
    pub fn iter(&self) -> impl Iterator<Item = ActivityItem> + 'a {
        let grades = self.grades;
        let students = self.students;
        let attendance = self.attendance;
        let today = self.today;
        let limit = self.limit;

        let grade_items = grades
            .iter()
            .rev()
            .take(RECENT_GRADE_COUNT)
            .filter_map(move |g| {
                let s = find_student(students, g.student_id.id())?;
                Some(ActivityItem {
                    kind: ActivityKind::Grade,
                    student_id: s.id,
                    message: format!("Grade recorded for {}", s.full_name()),
                    time: "2 hours ago",
                    icon: "BookOpen",
                })
            });

        let todays: Vec<&'a Attendance> = attendance
            .iter()
            .filter(|a| a.date == Some(today))
            .collect();
        let skip = todays.len().saturating_sub(RECENT_ATTENDANCE_COUNT);
        let attendance_items = todays.into_iter().skip(skip).filter_map(move |a| {
            let s = find_student(students, a.student_id.id())?;
            let status = a.status.map(|st| st.as_str()).unwrap_or("unmarked");
            Some(ActivityItem {
                kind: ActivityKind::Attendance,
                student_id: s.id,
                message: format!("{} marked {}", s.full_name(), status.to_lowercase()),
                time: "1 hour ago",
                icon: "CheckSquare",
            })
        });

        grade_items.chain(attendance_items).take(limit)
    }
}

pub fn build_recent_activity<'a>(
    grades: &'a [Grade],
    attendance: &'a [Attendance],
    students: &'a [Student],
    today: NaiveDate,
    limit: usize,
) -> RecentActivity<'a> {
    RecentActivity {
        grades,
        attendance,
        students,
        today,
        limit,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub today: NaiveDate,
    pub stats: DashboardStats,
    pub recent_activity: Vec<ActivityItem>,
}
