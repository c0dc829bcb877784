//! Field rules for student drafts.
//!
//! Every rule runs on every call so the form can show all problems at once;
//! a draft is submittable exactly when [`validate`] returns no errors.

use std::{collections::BTreeMap, fmt};

use shared::{
    domain::{gpa_in_range, Branch, RollId, Student},
    protocol::{CreateStudentRequest, UpdateStudentRequest},
};

pub const ROLL_REQUIRED: &str = "Roll number is required";
pub const NAME_REQUIRED: &str = "Name is required";
pub const BRANCH_REQUIRED: &str = "Branch is required";
pub const BRANCH_UNKNOWN: &str = "Branch must be one of CSE, ECE, ME, IT, CE";
pub const GPA_REQUIRED: &str = "GPA is required";
pub const GPA_NOT_A_NUMBER: &str = "GPA must be a number";
pub const GPA_OUT_OF_RANGE: &str = "GPA must be between 0 and 10";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Roll,
    Name,
    Branch,
    Gpa,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Roll, Field::Name, Field::Branch, Field::Gpa];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Roll => "roll",
            Field::Name => "name",
            Field::Branch => "branch",
            Field::Gpa => "gpa",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Editable form contents; every field is raw user text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentDraft {
    pub roll: String,
    pub name: String,
    pub branch: String,
    pub gpa: String,
}

impl StudentDraft {
    /// Blank form for a new student, branch preselected.
    pub fn for_create() -> Self {
        Self {
            branch: Branch::Cse.as_str().to_string(),
            ..Self::default()
        }
    }

    pub fn from_student(student: &Student) -> Self {
        Self {
            roll: student.roll.as_str().to_string(),
            name: student.name.clone(),
            branch: student.branch.as_str().to_string(),
            gpa: student.gpa.to_string(),
        }
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Roll => &self.roll,
            Field::Name => &self.name,
            Field::Branch => &self.branch,
            Field::Gpa => &self.gpa,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into();
        match field {
            Field::Roll => self.roll = value,
            Field::Name => self.name = value,
            Field::Branch => self.branch = value,
            Field::Gpa => self.gpa = value,
        }
    }

    /// Typed, trimmed submission, or the full set of field errors.
    pub fn submission(&self) -> Result<StudentSubmission, FieldErrors> {
        let errors = validate(self);
        if !errors.is_empty() {
            return Err(errors);
        }
        match (self.branch.parse::<Branch>(), parse_gpa(&self.gpa)) {
            (Ok(branch), Ok(gpa)) => Ok(StudentSubmission {
                roll: RollId::new(self.roll.trim()),
                name: self.name.trim().to_string(),
                branch,
                gpa,
            }),
            // validate() already rejected both of these cases.
            _ => Err(errors),
        }
    }
}

/// A draft that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentSubmission {
    pub roll: RollId,
    pub name: String,
    pub branch: Branch,
    pub gpa: f64,
}

impl StudentSubmission {
    pub fn create_request(&self) -> CreateStudentRequest {
        CreateStudentRequest {
            roll: self.roll.clone(),
            name: self.name.clone(),
            branch: self.branch,
            gpa: self.gpa,
        }
    }

    pub fn update_request(&self) -> UpdateStudentRequest {
        UpdateStudentRequest {
            name: self.name.clone(),
            branch: self.branch,
            gpa: self.gpa,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// Drops the error for a field the user just edited.
    pub fn clear(&mut self, field: Field) {
        self.0.remove(&field);
    }

    fn insert(&mut self, field: Field, message: &str) {
        self.0.insert(field, message.to_string());
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (field, message)) in self.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

pub fn validate(draft: &StudentDraft) -> FieldErrors {
    let mut errors = FieldErrors::default();

    if draft.roll.trim().is_empty() {
        errors.insert(Field::Roll, ROLL_REQUIRED);
    }
    if draft.name.trim().is_empty() {
        errors.insert(Field::Name, NAME_REQUIRED);
    }
    if draft.branch.trim().is_empty() {
        errors.insert(Field::Branch, BRANCH_REQUIRED);
    } else if draft.branch.parse::<Branch>().is_err() {
        errors.insert(Field::Branch, BRANCH_UNKNOWN);
    }
    if let Err(message) = parse_gpa(&draft.gpa) {
        errors.insert(Field::Gpa, message);
    }

    errors
}

fn parse_gpa(raw: &str) -> Result<f64, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(GPA_REQUIRED);
    }
    let value = raw
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(GPA_NOT_A_NUMBER)?;
    if !gpa_in_range(value) {
        return Err(GPA_OUT_OF_RANGE);
    }
    Ok(value)
}

#[cfg(test)]
#[path = "tests/validator_tests.rs"]
mod tests;
