pub mod config;
pub mod rates;

pub use config::{load_from_env, load_sheet};
pub use rates::{loyalty_multiplier, Speciality, TariffSheet};
