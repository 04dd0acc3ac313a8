pub mod age;
pub mod config;
pub mod error;
pub mod types;

pub use age::{resolve_age_policy, AgeClass, AgePolicy};
pub use config::{AiProvider, ClassifierFailurePolicy, Config};
pub use error::WeblanteError;
pub use types::*;
