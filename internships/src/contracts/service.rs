use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Months, Utc};
use tracing::{debug, error, info, warn};

use tariff::TariffSheet;

use super::models::{Contract, ContractDraft, ContractId};
use super::store::{ContractStore, JsonContractStore};
use crate::students::{JsonStudentStore, Student, StudentStore};

/// Renewal is only accepted inside this window before expiration. A fixed
/// 30-day month, not calendar-aware.
const RENEWAL_WINDOW_DAYS: i64 = 30;

/// Renewal eligibility cap on the student's unarchived contracts.
const MAX_ACTIVE_CONTRACTS: usize = 3;

/// The assignment path links only while the student's archived-contract
/// count stays at or below this cap.
const MAX_ARCHIVED_AT_ASSIGNMENT: usize = 4;

/// Domain failures surfaced to the caller. Storage failures pass through
/// untouched; there is no retry or partial success at this layer.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Contract lifecycle and renewal operations over the two store seams.
#[derive(Clone)]
pub struct ContractService {
    contracts: Arc<dyn ContractStore>,
    students: Arc<dyn StudentStore>,
    tariff: TariffSheet,
}

impl ContractService {
    /// Service against the JSON stores under the default data directory and
    /// the environment-configured tariff sheet.
    pub fn new() -> Result<Self> {
        let data_dir = default_data_dir()?;
        let contracts = JsonContractStore::open(data_dir.join("contracts.json"))?;
        let students = JsonStudentStore::open(data_dir.join("students.json"))?;
        Ok(Self::with_dependencies(
            Arc::new(contracts),
            Arc::new(students),
            tariff::load_from_env(),
        ))
    }

    pub fn with_dependencies(
        contracts: Arc<dyn ContractStore>,
        students: Arc<dyn StudentStore>,
        tariff: TariffSheet,
    ) -> Self {
        Self {
            contracts,
            students,
            tariff,
        }
    }

    /// Every stored contract, no filtering, no ordering guarantee.
    pub fn list_contracts(&self) -> Result<Vec<Contract>, ContractError> {
        Ok(self.contracts.list()?)
    }

    pub fn add_contract(&self, draft: ContractDraft) -> Result<Contract, ContractError> {
        let contract = Contract {
            id: ContractId::new(),
            start_date: draft.start_date,
            end_date: draft.end_date,
            speciality: draft.speciality,
            archived: Some(false),
            amount: draft.amount,
            student: None,
        };
        let saved = self.contracts.upsert(contract)?;
        debug!(contract = %saved.id, speciality = %saved.speciality, "created contract");
        Ok(saved)
    }

    pub fn update_contract(&self, contract: Contract) -> Result<Contract, ContractError> {
        Ok(self.contracts.upsert(contract)?)
    }

    /// Absence is an answer here, not an error.
    pub fn get_contract(&self, id: &ContractId) -> Result<Option<Contract>, ContractError> {
        Ok(self.contracts.get(id)?)
    }

    /// Loads the record first; an unresolvable id is a typed failure rather
    /// than a blind delete.
    pub fn remove_contract(&self, id: &ContractId) -> Result<(), ContractError> {
        let contract = self
            .contracts
            .get(id)?
            .ok_or_else(|| ContractError::NotFound(format!("contract {id}")))?;
        self.contracts.delete(&contract.id)?;
        debug!(contract = %id, "removed contract");
        Ok(())
    }

    /// Link a contract to the student found by name. The cap counts the
    /// student's archived contracts (an inversion inherited from the rule's
    /// origin); at or under the cap the link is made on both sides, over it
    /// the link is silently skipped and the contract comes back unchanged.
    pub fn assign_contract_to_student(
        &self,
        id: &ContractId,
        first_name: &str,
        last_name: &str,
    ) -> Result<Contract, ContractError> {
        let mut student = self
            .students
            .find_by_name(first_name, last_name)?
            .ok_or_else(|| {
                ContractError::NotFound(format!("student {first_name} {last_name}"))
            })?;
        let mut contract = self
            .contracts
            .get(id)?
            .ok_or_else(|| ContractError::NotFound(format!("contract {id}")))?;

        let archived = self
            .linked_contracts(&student)?
            .iter()
            .filter(|c| c.is_archived())
            .count();
        if archived > MAX_ARCHIVED_AT_ASSIGNMENT {
            info!(
                contract = %id,
                student = %student.id,
                archived,
                "assignment skipped, archived-contract cap reached"
            );
            return Ok(contract);
        }

        contract.student = Some(student.id);
        student.contracts.insert(contract.id);
        let contract = self.contracts.upsert(contract)?;
        self.students.upsert(student)?;
        info!(contract = %id, "assigned contract to student");
        Ok(contract)
    }

    /// Range-bounded count of valid contracts; what "valid" means is decided
    /// by the store.
    pub fn count_valid_contracts(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<u64, ContractError> {
        Ok(self.contracts.count_valid_between(from, to)?)
    }

    /// Archival sweep. For each contract not archived, the elapsed days
    /// since its end date (truncated, mod 365) trigger a notification at
    /// exactly 15 and archival at exactly 0. The exact-match triggers can
    /// skip a contract entirely when no sweep lands on the precise day; that
    /// behavior is inherited and deliberately kept.
    pub fn update_contract_statuses(&self) -> Result<(), ContractError> {
        let now = Utc::now();
        for mut contract in self.contracts.list()? {
            if contract.is_archived() {
                continue;
            }
            let elapsed_days = (now - contract.end_date).num_days() % 365;
            if elapsed_days == 15 {
                info!(
                    contract = %contract.id,
                    end_date = %contract.end_date,
                    "contract ended 15 days ago, notifying"
                );
            }
            if elapsed_days == 0 {
                let id = contract.id;
                contract.archived = Some(true);
                self.contracts.upsert(contract)?;
                info!(contract = %id, "archived contract in status sweep");
            }
        }
        Ok(())
    }

    /// Revenue across the whole book for the given span. The span only
    /// derives the month multiplier (fractional days, mod 365, over a
    /// 30-day month); every stored contract contributes at its speciality's
    /// monthly rate regardless of its own dates.
    pub fn revenue_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<f32, ContractError> {
        const MS_PER_DAY: f32 = 86_400_000.0;
        let span_days = ((to - from).num_milliseconds() as f32 / MS_PER_DAY) % 365.0;
        let span_months = span_days / 30.0;

        let mut revenue = 0.0_f32;
        for contract in self.contracts.list()? {
            revenue += span_months * self.tariff.monthly_rate(contract.speciality);
        }
        debug!(months = f64::from(span_months), revenue = f64::from(revenue), "computed revenue");
        Ok(revenue)
    }

    /// Renew a contract: validate, price, then replace. The archived
    /// original and its replacement are committed in a single store call so
    /// an interruption cannot leave the original archived with no successor.
    pub fn renew_contract(
        &self,
        id: &ContractId,
        additional_months: u32,
    ) -> Result<Contract, ContractError> {
        info!(contract = %id, months = additional_months, "starting contract renewal");

        let existing = self.contracts.get(id)?.ok_or_else(|| {
            error!(contract = %id, "renewal target not found");
            ContractError::NotFound(format!("contract {id}"))
        })?;
        debug!(
            contract = %id,
            speciality = %existing.speciality,
            amount = existing.amount,
            archived = ?existing.archived,
            "loaded renewal target"
        );

        if existing.is_archived() {
            error!(contract = %id, "attempted to renew an archived contract");
            return Err(ContractError::InvalidState(
                "cannot renew an archived contract".into(),
            ));
        }

        let now = Utc::now();
        let until_expiry = existing.end_date - now;
        debug!(contract = %id, days_until_expiry = until_expiry.num_days(), "renewal window check");
        if until_expiry < Duration::zero() || until_expiry > Duration::days(RENEWAL_WINDOW_DAYS) {
            error!(
                contract = %id,
                days_until_expiry = until_expiry.num_days(),
                "renewal rejected, outside the renewal window"
            );
            return Err(ContractError::InvalidState(format!(
                "contract can only be renewed within {RENEWAL_WINDOW_DAYS} days of expiration"
            )));
        }

        let student_id = existing.student.ok_or_else(|| {
            error!(contract = %id, "contract is not assigned to any student");
            ContractError::InvalidState("contract is not assigned to any student".into())
        })?;
        let mut student = self.students.get(&student_id)?.ok_or_else(|| {
            error!(contract = %id, student = %student_id, "linked student record missing");
            ContractError::NotFound(format!("student {student_id}"))
        })?;

        let linked = self.linked_contracts(&student)?;
        let active = linked.iter().filter(|c| !c.is_archived()).count();
        debug!(student = %student.id, active, "active contract check");
        if active > MAX_ACTIVE_CONTRACTS {
            error!(student = %student.id, active, "student has too many active contracts");
            return Err(ContractError::InvalidState(
                "student has too many active contracts".into(),
            ));
        }

        let completed = linked.iter().filter(|c| c.is_archived()).count() as u64;
        let base = self.tariff.base_amount(existing.speciality);
        let multiplier = tariff::loyalty_multiplier(completed);
        let amount = (base as f32 * multiplier).round() as i32;
        info!(
            contract = %id,
            base,
            multiplier = f64::from(multiplier),
            amount,
            completed,
            "calculated renewal amount"
        );

        let end_date = existing
            .end_date
            .checked_add_months(Months::new(additional_months))
            .ok_or_else(|| {
                ContractError::InvalidState("renewal end date out of range".into())
            })?;
        let renewed = Contract {
            id: ContractId::new(),
            start_date: existing.end_date,
            end_date,
            speciality: existing.speciality,
            archived: Some(false),
            amount,
            student: Some(student_id),
        };

        let mut original = existing;
        original.archived = Some(true);
        let original_id = original.id;
        self.contracts
            .upsert_many(vec![original, renewed.clone()])?;
        info!(contract = %original_id, "archived original contract");

        student.contracts.insert(renewed.id);
        self.students.upsert(student)?;
        info!(contract = %renewed.id, original = %original_id, "contract renewal complete");
        Ok(renewed)
    }

    /// Resolve the student's contract set against the store. Dangling ids
    /// are tolerated with a warning so a single stale reference cannot wedge
    /// renewal or assignment.
    fn linked_contracts(&self, student: &Student) -> Result<Vec<Contract>, ContractError> {
        let mut linked = Vec::with_capacity(student.contracts.len());
        for id in &student.contracts {
            match self.contracts.get(id)? {
                Some(contract) => linked.push(contract),
                None => {
                    warn!(contract = %id, student = %student.id, "skipping dangling contract reference")
                }
            }
        }
        Ok(linked)
    }
}

fn default_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("INTERNSHIPS_DATA_HOME") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(dir) = std::env::var("INTERNSHIPS_HOME") {
        return Ok(PathBuf::from(dir).join("data"));
    }
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home).join(".internships"));
    }
    Err(anyhow!(
        "Unable to determine data directory. Set INTERNSHIPS_DATA_HOME or HOME"
    ))
}
