//! Output formatting modules.

pub mod json;
pub mod table;

pub use json::{format_json, format_json_schema};
pub use table::format_table;
