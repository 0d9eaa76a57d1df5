//! Per-product rewriting of values before they are serialized.

use std::fmt;

use crate::soap::errors::MarshalError;
use crate::soap::value::SoapValue;

/// Rewrites a value before serialization.
///
/// The marshaller calls [`Packer::pack`] on every value it serializes,
/// nested values included, so an implementation only has to handle the
/// node it is given.
pub trait Packer: fmt::Debug + Send + Sync {
    /// Rewrites one value.
    ///
    /// # Errors
    ///
    /// Returns a [`MarshalError`] for values the product cannot represent.
    fn pack(&self, value: SoapValue) -> Result<SoapValue, MarshalError>;
}

/// Leaves every value unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPacker;

impl Packer for DefaultPacker {
    fn pack(&self, value: SoapValue) -> Result<SoapValue, MarshalError> {
        Ok(value)
    }
}
