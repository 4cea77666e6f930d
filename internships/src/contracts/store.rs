use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::{Contract, ContractId};

/// Storage seam for contracts. `upsert_many` commits all records or none of
/// them, which renewal relies on when it replaces one contract with another.
pub trait ContractStore: Send + Sync {
    fn get(&self, id: &ContractId) -> Result<Option<Contract>>;
    fn list(&self) -> Result<Vec<Contract>>;
    fn upsert(&self, contract: Contract) -> Result<Contract>;
    fn upsert_many(&self, contracts: Vec<Contract>) -> Result<Vec<Contract>>;
    /// Returns whether a record was actually removed.
    fn delete(&self, id: &ContractId) -> Result<bool>;
    /// Range aggregate. What counts as "valid" is a store-level decision;
    /// see the implementation for the reference definition.
    fn count_valid_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<u64>;
}

/// Reference store: in-memory map snapshotted to a JSON file on every write.
#[derive(Debug, Clone)]
pub struct JsonContractStore {
    path: PathBuf,
    state: Arc<RwLock<ContractDb>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ContractDb {
    contracts: HashMap<ContractId, Contract>,
}

impl JsonContractStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading contract store at {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| "parsing contract store JSON")?
        } else {
            ContractDb::default()
        };

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(state)),
        })
    }
}

impl ContractStore for JsonContractStore {
    fn get(&self, id: &ContractId) -> Result<Option<Contract>> {
        let guard = self.state.read().expect("contract store lock poisoned");
        Ok(guard.contracts.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Contract>> {
        let guard = self.state.read().expect("contract store lock poisoned");
        Ok(guard.contracts.values().cloned().collect())
    }

    fn upsert(&self, contract: Contract) -> Result<Contract> {
        self.upsert_many(vec![contract])
            .map(|mut saved| saved.remove(0))
    }

    fn upsert_many(&self, contracts: Vec<Contract>) -> Result<Vec<Contract>> {
        let mut guard = self.state.write().expect("contract store lock poisoned");
        for contract in &contracts {
            guard.contracts.insert(contract.id, contract.clone());
        }
        let snapshot = guard.clone();
        drop(guard);
        persist(&self.path, &snapshot)?;
        Ok(contracts)
    }

    fn delete(&self, id: &ContractId) -> Result<bool> {
        let mut guard = self.state.write().expect("contract store lock poisoned");
        let removed = guard.contracts.remove(id).is_some();
        let snapshot = guard.clone();
        drop(guard);
        if removed {
            persist(&self.path, &snapshot)?;
        }
        Ok(removed)
    }

    fn count_valid_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<u64> {
        let guard = self.state.read().expect("contract store lock poisoned");
        // reference definition of "valid": unarchived and lying wholly
        // inside the range
        Ok(guard
            .contracts
            .values()
            .filter(|c| !c.is_archived() && c.start_date >= from && c.end_date <= to)
            .count() as u64)
    }
}

fn persist(path: &Path, db: &ContractDb) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating contract store directory {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(db).context("serializing contract store")?;
    std::fs::write(path, json)
        .with_context(|| format!("writing contract store to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tariff::Speciality;

    use super::*;

    fn contract(from: DateTime<Utc>, to: DateTime<Utc>) -> Contract {
        Contract {
            id: ContractId::new(),
            start_date: from,
            end_date: to,
            speciality: Speciality::Cloud,
            archived: Some(false),
            amount: 1000,
            student: None,
        }
    }

    #[test]
    fn upsert_get_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonContractStore::open(dir.path().join("contracts.json")).unwrap();

        let now = Utc::now();
        let saved = store.upsert(contract(now, now + Duration::days(90))).unwrap();
        assert!(store.get(&saved.id).unwrap().is_some());

        assert!(store.delete(&saved.id).unwrap());
        assert!(!store.delete(&saved.id).unwrap());
        assert!(store.get(&saved.id).unwrap().is_none());
    }

    #[test]
    fn reload_sees_prior_mutations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contracts.json");
        let now = Utc::now();

        let saved = {
            let store = JsonContractStore::open(path.clone()).unwrap();
            store.upsert(contract(now, now + Duration::days(30))).unwrap()
        };

        let reopened = JsonContractStore::open(path).unwrap();
        let loaded = reopened.get(&saved.id).unwrap().unwrap();
        assert_eq!(loaded.amount, 1000);
        assert_eq!(loaded.speciality, Speciality::Cloud);
    }

    #[test]
    fn upsert_many_lands_every_record_in_one_commit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contracts.json");
        let now = Utc::now();

        let store = JsonContractStore::open(path.clone()).unwrap();
        let a = contract(now, now + Duration::days(10));
        let b = contract(now, now + Duration::days(20));
        store.upsert_many(vec![a.clone(), b.clone()]).unwrap();

        let reopened = JsonContractStore::open(path).unwrap();
        assert!(reopened.get(&a.id).unwrap().is_some());
        assert!(reopened.get(&b.id).unwrap().is_some());
    }

    #[test]
    fn count_valid_between_excludes_archived_and_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonContractStore::open(dir.path().join("contracts.json")).unwrap();

        let from = Utc::now();
        let to = from + Duration::days(180);

        store.upsert(contract(from, to)).unwrap();
        store
            .upsert(contract(from + Duration::days(1), to - Duration::days(1)))
            .unwrap();
        // straddles the upper bound
        store.upsert(contract(from, to + Duration::days(1))).unwrap();
        // archived
        let mut archived = contract(from, to);
        archived.archived = Some(true);
        store.upsert(archived).unwrap();

        assert_eq!(store.count_valid_between(from, to).unwrap(), 2);
    }
}
