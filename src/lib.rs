pub mod config;
pub mod export;
pub mod import;
pub mod record;
pub mod schema;
pub mod store;
pub mod view;
