mod models;
mod store;

pub use models::{Student, StudentId};
pub use store::{JsonStudentStore, StudentStore};
