#![forbid(unsafe_code)]

pub mod app;
pub mod catalog;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod handler;
pub mod model;
pub mod preprocess;
pub mod schema;
pub mod validate;

pub use app::{create_router, AppState};
pub use config::Config;
pub use model::ModelManager;
pub use validate::Validator;
