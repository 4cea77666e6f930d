use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::models::{Student, StudentId};

/// Storage seam for students. Lookup by name returns a single match or
/// absence; duplicates are a data problem the store does not arbitrate.
pub trait StudentStore: Send + Sync {
    fn get(&self, id: &StudentId) -> Result<Option<Student>>;
    fn find_by_name(&self, first_name: &str, last_name: &str) -> Result<Option<Student>>;
    fn upsert(&self, student: Student) -> Result<Student>;
}

/// Reference store: in-memory map snapshotted to a JSON file on every write.
#[derive(Debug, Clone)]
pub struct JsonStudentStore {
    path: PathBuf,
    state: Arc<RwLock<StudentDb>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StudentDb {
    students: HashMap<StudentId, Student>,
}

impl JsonStudentStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading student store at {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| "parsing student store JSON")?
        } else {
            StudentDb::default()
        };

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(state)),
        })
    }
}

impl StudentStore for JsonStudentStore {
    fn get(&self, id: &StudentId) -> Result<Option<Student>> {
        let guard = self.state.read().expect("student store lock poisoned");
        Ok(guard.students.get(id).cloned())
    }

    fn find_by_name(&self, first_name: &str, last_name: &str) -> Result<Option<Student>> {
        let guard = self.state.read().expect("student store lock poisoned");
        Ok(guard
            .students
            .values()
            .find(|s| s.first_name == first_name && s.last_name == last_name)
            .cloned())
    }

    fn upsert(&self, student: Student) -> Result<Student> {
        let mut guard = self.state.write().expect("student store lock poisoned");
        guard.students.insert(student.id, student.clone());
        let snapshot = guard.clone();
        drop(guard);
        persist(&self.path, &snapshot)?;
        Ok(student)
    }
}

fn persist(path: &Path, db: &StudentDb) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating student store directory {}", parent.display()))?;
    }
    let json = serde_json::to_vec_pretty(db).context("serializing student store")?;
    std::fs::write(path, json)
        .with_context(|| format!("writing student store to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_by_name_matches_both_parts() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStudentStore::open(dir.path().join("students.json")).unwrap();

        let amal = store.upsert(Student::new("Amal", "Haddad")).unwrap();
        store.upsert(Student::new("Amal", "Trabelsi")).unwrap();

        let found = store.find_by_name("Amal", "Haddad").unwrap().unwrap();
        assert_eq!(found.id, amal.id);
        assert!(store.find_by_name("Nour", "Haddad").unwrap().is_none());
    }

    #[test]
    fn reload_sees_prior_upserts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.json");

        let student = {
            let store = JsonStudentStore::open(path.clone()).unwrap();
            store.upsert(Student::new("Lina", "Bouaziz")).unwrap()
        };

        let reopened = JsonStudentStore::open(path).unwrap();
        let loaded = reopened.get(&student.id).unwrap().unwrap();
        assert_eq!(loaded.last_name, "Bouaziz");
    }
}
