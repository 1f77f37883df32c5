//! Crate-wide error types.
//!
//! Failures a caller must handle as values, rather than as recorded
//! validation checks, live here. Currently that is only
//! [`VerificationError`] for checks of an object against outside
//! information such as an issuer key.

use std::fmt;
use bcder::decode::ContentError;
use crate::crypto::SignatureVerificationError;


//------------ VerificationError ---------------------------------------------

/// An object fails a check against information from outside the object.
#[derive(Debug)]
pub struct VerificationError {
    inner: ContentError,
}

impl VerificationError {
    pub fn new(err: impl Into<ContentError>) -> Self {
        VerificationError { inner: err.into() }
    }
}

impl From<ContentError> for VerificationError {
    fn from(err: ContentError) -> VerificationError {
        VerificationError { inner: err }
    }
}

impl From<SignatureVerificationError> for VerificationError {
    fn from(err: SignatureVerificationError) -> Self {
        ContentError::from(err).into()
    }
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl std::error::Error for VerificationError { }
