use serde::{Deserialize, Serialize};

use crate::domain::{Branch, RollId, Student};

pub fn students_route() -> &'static str {
    "/students"
}

pub fn student_route() -> &'static str {
    "/student"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListStudentsResponse {
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateStudentRequest {
    #[serde(alias = "rollId")]
    pub roll: RollId,
    pub name: String,
    pub branch: Branch,
    pub gpa: f64,
}

/// Body of `PUT /student/{roll}`; the roll travels in the path only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStudentRequest {
    pub name: String,
    pub branch: Branch,
    pub gpa: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Student>,
}

impl MutationResponse {
    pub fn ok(message: impl Into<String>, data: Option<Student>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}
