pub mod derive;
pub mod sanitize;
pub mod types;

pub use derive::{derive_columns, humanize};
pub use sanitize::sanitize_field_name;
pub use types::Column;
