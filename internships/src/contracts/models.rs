use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tariff::Speciality;

use crate::students::StudentId;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContractId(Uuid);

impl ContractId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A time-bounded internship agreement. The archived flag is nullable on
/// ingest; every consumer applies its own null-coalescing rule, so the raw
/// `Option` is kept rather than collapsed at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: ContractId,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub speciality: Speciality,
    #[serde(default)]
    pub archived: Option<bool>,
    pub amount: i32,
    #[serde(default)]
    pub student: Option<StudentId>,
}

impl Contract {
    /// Archived means an explicit true flag; an absent flag counts as live.
    pub fn is_archived(&self) -> bool {
        matches!(self.archived, Some(true))
    }
}

/// Creation request. New contracts always start unarchived and unassigned.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDraft {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub speciality: Speciality,
    pub amount: i32,
}
