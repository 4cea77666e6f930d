//! Contract lifecycle and renewal core for the internship platform.
//!
//! The [`contracts`] module holds the contract records, the store seam, and
//! the [`contracts::ContractService`] every caller goes through; [`students`]
//! holds the owning side of the contract link. Persistence is reached only
//! through the store traits; the JSON-file stores stand in for the relational
//! layer the surrounding platform provides.

pub mod contracts;
pub mod students;
