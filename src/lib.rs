pub mod config;
pub mod error;
pub mod model;
pub mod page;
pub mod server;

pub use config::AppConfig;
pub use error::ServiceError;
pub use model::{ModelCatalog, ModelRegistry, Prediction};
pub use server::build_router;
