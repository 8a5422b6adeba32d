pub mod catalog;
pub mod config;
pub mod error;
pub mod file_config;
pub mod text;
pub mod types;

pub use catalog::{recommendation_candidates, CandidateGoods, JsonCatalog, ProductCatalog};
pub use config::AppConfig;
pub use error::CatalogError;
pub use file_config::{load_config, resolve_relative, FileConfig, PersonaPreset};
pub use types::*;
