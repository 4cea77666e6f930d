mod models;
mod service;
mod store;

pub use models::{Contract, ContractDraft, ContractId};
pub use service::{ContractError, ContractService};
pub use store::{ContractStore, JsonContractStore};

pub use tariff::Speciality;
