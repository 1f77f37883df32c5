//! Basic cryptographic primitives.
//!
//! This module provides the types and traits for public keys, digests, and
//! signatures, as well as the [`Signer`] trait for creating signatures with
//! private keys held elsewhere.

pub use self::digest::{Digest, DigestAlgorithm};
pub use self::keys::{
    KeyIdentifier, PublicKey, PublicKeyFormat, SignatureVerificationError,
};
pub use self::signature::{RpkiSignature, RpkiSignatureAlgorithm, Signature};
pub use self::signer::{KeyError, Signer, SigningError};

#[cfg(any(feature = "softkeys", test))]
pub use self::softsigner::OpenSslSigner;

pub mod digest;
pub mod keys;
pub mod signature;
pub mod signer;

#[cfg(any(feature = "softkeys", test))]
pub mod softsigner;
