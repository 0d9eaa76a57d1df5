//! Errors raised while building PQL statements.

use thiserror::Error;

/// A statement or bind variable that cannot be sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatementError {
    /// `SELECT` was given without `FROM`.
    #[error("FROM clause required with SELECT.")]
    MissingFrom,

    /// `FROM` was given without `SELECT`.
    #[error("SELECT clause required with FROM.")]
    MissingSelect,

    /// A date-time bind value has no time zone.
    #[error("Datetime {value} is not timezone aware.")]
    NaiveDateTime {
        /// The rejected value.
        value: String,
    },

    /// A set bind value mixes element types.
    #[error("Cannot pass more than one type in a set: found {first} and {other}.")]
    MixedSetVariants {
        /// Type of the first element.
        first: &'static str,
        /// The first differing type.
        other: &'static str,
    },

    /// The value has no PQL representation.
    #[error("Can't represent unknown type: {type_name}.")]
    UnsupportedBindType {
        /// Description of the rejected value.
        type_name: String,
    },
}

// Verify StatementError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<StatementError>();
};
