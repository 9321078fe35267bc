pub mod json_safe;

pub use json_safe::json_safe;
