//! Business-rule checks run before a write reaches a store. The stores only
//! know about ids; everything else is enforced here.

use regex::Regex;
use std::sync::OnceLock;

use crate::calc::grade_validity;
use crate::error::{EngineError, Result};
use crate::join::IdRef;
use crate::model::{Assignment, Attendance, Class, Grade, Student};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"))
}

pub fn is_valid_email(email: &str) -> bool {
    email_pattern().is_match(email)
}

pub fn check_grade_score(score: f64, max_score: f64) -> Result<()> {
    if grade_validity(score, max_score) {
        Ok(())
    } else {
        Err(EngineError::invalid(format!(
            "score must be between 0 and {}",
            max_score
        )))
    }
}

fn require_text(value: &str, label: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EngineError::invalid(format!("{} is required", label)));
    }
    Ok(())
}

fn require_ref(value: &IdRef, field: &str) -> Result<()> {
    if value.id().is_none() {
        return Err(EngineError::MalformedReference {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn require_positive_max(max_score: f64) -> Result<()> {
    if !max_score.is_finite() || max_score <= 0.0 {
        return Err(EngineError::invalid("maxScore must be a positive number"));
    }
    Ok(())
}

impl Validate for Student {
    fn validate(&self) -> Result<()> {
        require_text(&self.first_name, "first name")?;
        require_text(&self.last_name, "last name")?;
        if self.grade_level.is_none() {
            return Err(EngineError::invalid("grade level is required"));
        }
        if self.date_of_birth.is_none() {
            return Err(EngineError::invalid("date of birth is required"));
        }
        if let Some(email) = self.email.as_deref() {
            if !email.is_empty() && !is_valid_email(email) {
                return Err(EngineError::invalid("valid email is required"));
            }
        }
        Ok(())
    }
}

impl Validate for Class {
    fn validate(&self) -> Result<()> {
        require_text(&self.name, "class name")?;
        require_text(&self.subject, "subject")
    }
}

impl Validate for Assignment {
    fn validate(&self) -> Result<()> {
        require_text(&self.name, "assignment name")?;
        require_ref(&self.class_id, "classId")?;
        require_positive_max(self.max_score)
    }
}

impl Validate for Grade {
    fn validate(&self) -> Result<()> {
        require_ref(&self.student_id, "studentId")?;
        require_ref(&self.class_id, "classId")?;
        require_ref(&self.assignment_id, "assignmentId")?;
        require_positive_max(self.max_score)?;
        check_grade_score(self.score, self.max_score)
    }
}

impl Validate for Attendance {
    fn validate(&self) -> Result<()> {
        require_ref(&self.student_id, "studentId")?;
        require_ref(&self.class_id, "classId")?;
        if self.date.is_none() {
            return Err(EngineError::invalid("date is required"));
        }
        if self.status.is_none() {
            return Err(EngineError::invalid("status is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttendanceStatus, GradeLevel};
    use chrono::NaiveDate;

    fn student() -> Student {
        Student {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            grade_level: Some(GradeLevel::Tenth),
            date_of_birth: NaiveDate::from_ymd_opt(2009, 12, 9),
            ..Student::default()
        }
    }

    #[test]
    fn student_requires_names_level_and_birth_date() {
        assert!(student().validate().is_ok());

        let mut s = student();
        s.first_name = "  ".to_string();
        assert_eq!(
            s.validate(),
            Err(EngineError::invalid("first name is required"))
        );

        let mut s = student();
        s.grade_level = None;
        assert!(s.validate().is_err());

        let mut s = student();
        s.date_of_birth = None;
        assert!(s.validate().is_err());
    }

    #[test]
    fn student_email_is_optional_but_checked() {
        let mut s = student();
        s.email = Some(String::new());
        assert!(s.validate().is_ok());
        s.email = Some("grace@navy.mil".to_string());
        assert!(s.validate().is_ok());
        s.email = Some("grace@navy".to_string());
        assert!(s.validate().is_err());
        s.email = Some("grace hopper@navy.mil".to_string());
        assert!(s.validate().is_err());
    }

    #[test]
    fn grade_score_must_fit_max_score() {
        let g = Grade {
            student_id: IdRef::from_id(1),
            class_id: IdRef::from_id(1),
            assignment_id: IdRef::from_id(1),
            score: 101.0,
            max_score: 100.0,
            ..Grade::default()
        };
        assert_eq!(
            g.validate(),
            Err(EngineError::invalid("score must be between 0 and 100"))
        );
        let ok = Grade { score: 100.0, ..g.clone() };
        assert!(ok.validate().is_ok());
        let zero_max = Grade {
            score: 0.0,
            max_score: 0.0,
            ..g
        };
        assert!(zero_max.validate().is_err());
    }

    #[test]
    fn references_must_resolve() {
        let a = Attendance {
            student_id: IdRef::from(serde_json::json!("nope")),
            class_id: IdRef::from_id(2),
            date: NaiveDate::from_ymd_opt(2024, 9, 3),
            status: Some(AttendanceStatus::Present),
            ..Attendance::default()
        };
        assert_eq!(
            a.validate(),
            Err(EngineError::MalformedReference {
                field: "studentId".to_string()
            })
        );
    }

    #[test]
    fn class_requires_name_and_subject() {
        let c = Class {
            name: "Period 1".to_string(),
            ..Class::default()
        };
        assert_eq!(c.validate(), Err(EngineError::invalid("subject is required")));
    }
}
