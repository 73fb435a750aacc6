//! Validation engine.
//!
//! Turns a raw answer into a typed value for one field, or explains why it
//! cannot. Nothing here mutates session state.

mod coerce;
mod engine;
mod failure;
mod value;

pub use coerce::{parse_bool, parse_date, parse_number};
pub use engine::{age_in_years, validate, validate_on};
pub use failure::{Constraint, ValidationFailure};
pub use value::TypedValue;
