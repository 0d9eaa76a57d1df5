//! PQL (Publisher Query Language) statements for Ad Manager.
//!
//! [`StatementBuilder`] renders `SELECT ... FROM ... WHERE ... ORDER BY ...
//! LIMIT ... OFFSET ...` queries and converts native bind values into the
//! typed `Value` objects the API expects. Passing a builder's statement to
//! a service through [`crate::soap::RequestContext::with_utility`] reports
//! it in that request's user agent.

mod errors;
mod statement;
mod value;

pub use errors::StatementError;
pub use statement::{FilterStatement, Statement, StatementBuilder, SUGGESTED_PAGE_LIMIT};
pub use value::{
    date_object, date_time_object, value_map_entry, BindValue, Number, PqlValues, TypedValue,
};
