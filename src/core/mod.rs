// Protocol data model, value coercion, config resolution, and error modeling.
pub mod coerce;
pub mod error;
pub mod resolve;
pub mod types;
pub mod value;
