pub mod csv;
pub mod json;
pub mod share;

pub use csv::to_csv;
pub use json::to_json;
