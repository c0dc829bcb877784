use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(RollId);
id_newtype!(ServerId);

impl ServerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Branch {
    Cse,
    Ece,
    Me,
    It,
    Ce,
}

impl Branch {
    pub const ALL: [Branch; 5] = [Branch::Cse, Branch::Ece, Branch::Me, Branch::It, Branch::Ce];

    pub fn as_str(self) -> &'static str {
        match self {
            Branch::Cse => "CSE",
            Branch::Ece => "ECE",
            Branch::Me => "ME",
            Branch::It => "IT",
            Branch::Ce => "CE",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown branch '{0}'")]
pub struct UnknownBranch(pub String);

impl FromStr for Branch {
    type Err = UnknownBranch;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Branch::ALL
            .into_iter()
            .find(|branch| branch.as_str() == trimmed)
            .ok_or_else(|| UnknownBranch(trimmed.to_string()))
    }
}

pub const GPA_MIN: f64 = 0.0;
pub const GPA_MAX: f64 = 10.0;

pub fn gpa_in_range(gpa: f64) -> bool {
    gpa.is_finite() && (GPA_MIN..=GPA_MAX).contains(&gpa)
}

/// A student record as the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ServerId>,
    #[serde(alias = "rollId")]
    pub roll: RollId,
    pub name: String,
    pub branch: Branch,
    pub gpa: f64,
}

impl Student {
    pub fn new(roll: impl Into<String>, name: impl Into<String>, branch: Branch, gpa: f64) -> Self {
        Self {
            id: None,
            roll: RollId::new(roll),
            name: name.into(),
            branch,
            gpa,
        }
    }
}
