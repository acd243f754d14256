//! People as the API embeds them in other records.

use serde::{Deserialize, Serialize};

use super::Batch;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub enrollment_number: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl UserSummary {
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.enrollment_number.clone()
        } else {
            name.to_string()
        }
    }
}

/// Profile returned by `users/<enrollment>`.
///
/// Students carry a batch; teachers carry department and experience.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user: UserSummary,
    #[serde(default)]
    pub batch: Option<Batch>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub years_of_teaching: Option<u32>,
}

pub type StudentProfile = UserProfile;

impl UserProfile {
    pub fn batch_name(&self) -> Option<&str> {
        self.batch.as_ref().map(|b| b.name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeacherStats {
    #[serde(rename = "totalStudents", default)]
    pub total_students: u32,
    #[serde(rename = "totalCourses", default)]
    pub total_courses: u32,
    #[serde(rename = "yearsOfTeaching", default)]
    pub years_of_teaching: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_profile() {
        let profile: StudentProfile = serde_json::from_str(
            r#"{
                "id": 4,
                "user": {"id": 7, "enrollment_number": "S123", "first_name": "Asha", "last_name": "Rao"},
                "batch": {"id": 1, "name": "CSE-2024"}
            }"#,
        )
        .unwrap();
        assert_eq!(profile.user.full_name(), "Asha Rao");
        assert_eq!(profile.batch_name(), Some("CSE-2024"));
        assert_eq!(profile.department, None);
    }

    #[test]
    fn test_full_name_falls_back_to_enrollment() {
        let user = UserSummary {
            id: 1,
            enrollment_number: "S999".to_string(),
            first_name: String::new(),
            last_name: " ".to_string(),
        };
        assert_eq!(user.full_name(), "S999");
    }

    #[test]
    fn test_teacher_stats_camel_case() {
        let stats: TeacherStats =
            serde_json::from_str(r#"{"totalStudents": 120, "totalCourses": 3, "yearsOfTeaching": 8}"#)
                .unwrap();
        assert_eq!(stats.total_students, 120);
        assert_eq!(stats.years_of_teaching, 8);
    }
}
