//! Establishing trust in RPKI data.
//!
//! The _Resource Public Key Infrastructure_ (RPKI) binds holdership of IP
//! address prefixes and AS numbers to X.509 certificates. This crate
//! contains the pieces needed to decide whether such a binding can be
//! trusted: a bottom-up validator for resource certificate chains with
//! per-certificate CRL and resource-delegation checks, the resource-set
//! model with its inherited semantics, and the signed CMS wrapper used by
//! the RPKI provisioning (up-down) protocol between a child CA and its
//! parent.
//!
//! Validators do not abort on the first problem they find. They report
//! every check, passing or failing, into a [`ValidationResult`] so that a
//! single validation run surfaces every independent problem at once.
//!
//! [`ValidationResult`]: validation::ValidationResult

pub mod cert;
pub mod crl;
pub mod crypto;
pub mod error;
pub mod oid;
pub mod provisioning;
pub mod resources;
pub mod validation;
pub mod validators;
pub mod x509;

mod util;
