//! Recording the outcome of validation.
//!
//! Validators in this crate do not abort on the first problem they find.
//! Instead, every rule they apply is recorded as a [`ValidationCheck`] in a
//! shared [`ValidationResult`], keyed by the location of the artifact under
//! check. A single validation run thus surfaces every independent problem
//! in one report and the caller decides what to do with it.
//!
//! The check keys are a fixed vocabulary collected in the [`keys`] module.
//! They are part of the public contract of the crate and consumers may
//! match on them.

use std::{error, fmt};


//------------ keys ----------------------------------------------------------

/// The fixed vocabulary of validation check keys.
///
/// Renaming a key is a breaking change.
pub mod keys {
    pub const CERT_PARSED: &str = "cert.parsed";
    pub const CERT_CHAIN_LENGTH: &str = "cert.chain.length";
    pub const CERT_CHAIN_COMPLETE: &str = "cert.chain.complete";
    pub const ROOT_IS_TA: &str = "root.is.ta";
    pub const CERT_ISSUER_IS_PARENT: &str = "cert.issuer.is.parent";
    pub const CERT_SIGNATURE_VALID: &str = "cert.signature.valid";
    pub const CERT_NOT_VALID_BEFORE: &str = "cert.not.valid.before";
    pub const CERT_NOT_VALID_AFTER: &str = "cert.not.valid.after";
    pub const CERT_NOT_REVOKED: &str = "cert.not.revoked";
    pub const CERT_RESOURCE_SET_NOT_HELD_BY_PARENT: &str
        = "cert.resource.set.held.by.parent";
    pub const CRL_PARSED: &str = "crl.parsed";
    pub const CRL_REQUIRED: &str = "crl.required";
    pub const CRL_SIGNATURE_VALID: &str = "crl.signature.valid";
    pub const CRL_NEXT_UPDATE_BEFORE_NOW: &str
        = "crl.next.update.before.now";
    pub const CMS_DATA_PARSING: &str = "cms.signed.data.parsing";
    pub const CMS_CONTENT_TYPE: &str = "cms.content.type";
    pub const CMS_SIGNER_CERTIFICATE: &str = "cms.signer.certificate";
    pub const CMS_CRL: &str = "cms.crl";
    pub const CMS_SIGNATURE: &str = "cms.signature";
}


//------------ ValidationStatus ----------------------------------------------

/// The status of a single recorded check.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ValidationStatus {
    /// The check passed.
    Ok,

    /// The check failed.
    Failure,

    /// The check passed but something is worth pointing out.
    Warning,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ValidationStatus::Ok => "ok",
            ValidationStatus::Failure => "failure",
            ValidationStatus::Warning => "warning",
        })
    }
}


//------------ ValidationCheck -----------------------------------------------

/// A single applied validation rule and its outcome.
///
/// Equality is by status and key only. The parameters carry contextual
/// values for a human reader and do not take part in comparisons.
#[derive(Clone, Debug)]
pub struct ValidationCheck {
    status: ValidationStatus,
    key: &'static str,
    params: Vec<String>,
}

impl ValidationCheck {
    fn new(
        status: ValidationStatus, key: &'static str, params: Vec<String>
    ) -> Self {
        Self { status, key, params }
    }

    /// Returns the status of the check.
    pub fn status(&self) -> ValidationStatus {
        self.status
    }

    /// Returns whether the check failed.
    pub fn is_failure(&self) -> bool {
        matches!(self.status, ValidationStatus::Failure)
    }

    /// Returns the key of the rule that was applied.
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Returns the contextual parameters of the check.
    pub fn params(&self) -> &[String] {
        &self.params
    }
}


//--- PartialEq and Eq

impl PartialEq for ValidationCheck {
    fn eq(&self, other: &Self) -> bool {
        self.status == other.status && self.key == other.key
    }
}

impl Eq for ValidationCheck {}


//--- Display

impl fmt::Display for ValidationCheck {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}]", self.key, self.status)?;
        for param in &self.params {
            write!(f, " {}", param)?;
        }
        Ok(())
    }
}


//------------ ValidationResult ----------------------------------------------

/// An accumulator for validation checks, partitioned by location.
///
/// A location is an opaque string naming the artifact under check, such as
/// a file name or a message identifier. Locations are kept in the order
/// they were first visited and each holds the ordered list of checks
/// recorded while it was the current location.
///
/// All recording methods return the condition they were given so they can
/// be used as inline guards:
///
/// ```
/// # use rpki_trust::validation::{keys, ValidationResult};
/// # fn test(result: &mut ValidationResult, complete: bool) {
/// result.set_location("chain");
/// if !result.is_true(complete, keys::CERT_CHAIN_COMPLETE) {
///     return
/// }
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct ValidationResult {
    /// Checks by location, in the order locations were first visited.
    results: Vec<(String, Vec<ValidationCheck>)>,

    /// Index of the current location into `results`.
    current: Option<usize>,
}

/// # Recording Checks
///
impl ValidationResult {
    /// Creates a new, empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `location` the current location.
    ///
    /// If the location has not been visited before, an empty check list is
    /// created for it. Revisiting a location keeps its existing checks.
    pub fn set_location(&mut self, location: impl Into<String>) {
        let location = location.into();
        let idx = match self.index_of(&location) {
            Some(idx) => idx,
            None => {
                self.results.push((location, Vec::new()));
                self.results.len() - 1
            }
        };
        self.current = Some(idx);
    }

    /// Records a check for `condition` at the current location.
    ///
    /// Returns `condition` unchanged.
    ///
    /// # Panics
    ///
    /// Panics if no current location has been set. Recording without a
    /// location is a programming error by the caller.
    pub fn is_true(&mut self, condition: bool, key: &'static str) -> bool {
        self.is_true_with(condition, key, [] as [&str; 0])
    }

    /// Records a check for `condition` with contextual parameters.
    ///
    /// Returns `condition` unchanged.
    pub fn is_true_with<I, T>(
        &mut self, condition: bool, key: &'static str, params: I
    ) -> bool
    where I: IntoIterator<Item = T>, T: Into<String> {
        let status = if condition { ValidationStatus::Ok }
                     else { ValidationStatus::Failure };
        self.record(ValidationCheck::new(
            status, key, params.into_iter().map(Into::into).collect()
        ));
        condition
    }

    /// Records a check that passes if `condition` is false.
    ///
    /// Returns the negated condition.
    pub fn is_false(&mut self, condition: bool, key: &'static str) -> bool {
        self.is_true(!condition, key)
    }

    /// Records a check that passes if `value` is some.
    ///
    /// Returns `value` unchanged.
    pub fn not_none<T>(
        &mut self, value: Option<T>, key: &'static str
    ) -> Option<T> {
        self.is_true(value.is_some(), key);
        value
    }

    /// Records a warning at the current location if `condition` is true.
    ///
    /// If the condition is false, a passing check is recorded instead.
    /// Returns `condition` unchanged.
    pub fn warn_if(&mut self, condition: bool, key: &'static str) -> bool {
        let status = if condition { ValidationStatus::Warning }
                     else { ValidationStatus::Ok };
        self.record(ValidationCheck::new(status, key, Vec::new()));
        condition
    }

    /// Appends a check to the current location.
    ///
    /// A check that is already present for the location with the same
    /// status, key, and parameters is not recorded again.
    fn record(&mut self, check: ValidationCheck) {
        let idx = match self.current {
            Some(idx) => idx,
            None => panic!("recording a check without a current location"),
        };
        let checks = &mut self.results[idx].1;
        if checks.iter().any(|present| {
            *present == check && present.params == check.params
        }) {
            return
        }
        checks.push(check)
    }
}

/// # Inspecting the Result
///
impl ValidationResult {
    /// Returns the current location if one has been set.
    pub fn current_location(&self) -> Option<&str> {
        self.current.map(|idx| self.results[idx].0.as_str())
    }

    /// Returns an iterator over all visited locations in visiting order.
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|(location, _)| location.as_str())
    }

    /// Returns whether any recorded check anywhere has failed.
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|(_, checks)| {
            checks.iter().any(ValidationCheck::is_failure)
        })
    }

    /// Returns whether any check at the given location has failed.
    ///
    /// Returns `false` for a location that has not been visited.
    pub fn has_failure_for_location(&self, location: &str) -> bool {
        self.index_of(location).map(|idx| {
            self.results[idx].1.iter().any(ValidationCheck::is_failure)
        }).unwrap_or(false)
    }

    /// Returns whether any check at the current location has failed.
    ///
    /// Returns `false` if no current location has been set.
    pub fn has_failure_for_current_location(&self) -> bool {
        self.current.map(|idx| {
            self.results[idx].1.iter().any(ValidationCheck::is_failure)
        }).unwrap_or(false)
    }

    /// Returns whether a check with the given key failed at the location.
    ///
    /// Returns `false` for a location that has not been visited.
    pub fn has_failures_for_location_and_key(
        &self, location: &str, key: &str
    ) -> bool {
        self.index_of(location).map(|idx| {
            self.results[idx].1.iter().any(|check| {
                check.key == key && check.is_failure()
            })
        }).unwrap_or(false)
    }

    /// Returns all failed checks at the given location in order.
    ///
    /// Returns an error if the location has never been visited. An
    /// unvisited location is a programming error by the caller, not an
    /// empty result.
    pub fn get_failures(
        &self, location: &str
    ) -> Result<Vec<&ValidationCheck>, InvalidLocation> {
        match self.index_of(location) {
            Some(idx) => {
                Ok(self.results[idx].1.iter().filter(|check| {
                    check.is_failure()
                }).collect())
            }
            None => Err(InvalidLocation::new(location))
        }
    }

    /// Returns the first check with the given key at the location.
    ///
    /// Returns an error if the location has never been visited.
    pub fn get_result(
        &self, location: &str, key: &str
    ) -> Result<Option<&ValidationCheck>, InvalidLocation> {
        match self.index_of(location) {
            Some(idx) => {
                Ok(self.results[idx].1.iter().find(|check| {
                    check.key == key
                }))
            }
            None => Err(InvalidLocation::new(location))
        }
    }

    /// Returns all checks at the given location in recording order.
    ///
    /// Returns an error if the location has never been visited.
    pub fn get_checks(
        &self, location: &str
    ) -> Result<&[ValidationCheck], InvalidLocation> {
        match self.index_of(location) {
            Some(idx) => Ok(&self.results[idx].1),
            None => Err(InvalidLocation::new(location))
        }
    }

    fn index_of(&self, location: &str) -> Option<usize> {
        self.results.iter().position(|(present, _)| present == location)
    }
}


//------------ InvalidLocation -----------------------------------------------

/// A location was queried that has never been visited.
#[derive(Clone, Debug)]
pub struct InvalidLocation(String);

impl InvalidLocation {
    fn new(location: &str) -> Self {
        Self(location.into())
    }

    /// Returns the offending location.
    pub fn location(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvalidLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "location '{}' has never been validated", self.0)
    }
}

impl error::Error for InvalidLocation {}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn recording_and_guards() {
        let mut result = ValidationResult::new();
        result.set_location("a.cer");
        assert!(result.is_true(true, keys::CERT_SIGNATURE_VALID));
        assert!(!result.is_true(false, keys::CERT_NOT_VALID_AFTER));
        assert!(result.is_false(false, keys::CERT_NOT_REVOKED));
        assert_eq!(result.not_none(Some(12), keys::CRL_REQUIRED), Some(12));
        assert!(result.has_failures());
        assert!(result.has_failure_for_location("a.cer"));
        assert!(result.has_failures_for_location_and_key(
            "a.cer", keys::CERT_NOT_VALID_AFTER
        ));
        assert!(!result.has_failures_for_location_and_key(
            "a.cer", keys::CERT_SIGNATURE_VALID
        ));
        let failures = result.get_failures("a.cer").unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].key(), keys::CERT_NOT_VALID_AFTER);
    }

    #[test]
    fn revisiting_a_location_keeps_checks() {
        let mut result = ValidationResult::new();
        result.set_location("a.cer");
        result.is_true(true, keys::CERT_SIGNATURE_VALID);
        result.set_location("b.cer");
        result.is_true(false, keys::CERT_SIGNATURE_VALID);
        result.set_location("a.cer");
        assert_eq!(result.current_location(), Some("a.cer"));
        assert_eq!(result.get_checks("a.cer").unwrap().len(), 1);
        assert_eq!(
            result.locations().collect::<Vec<_>>(),
            ["a.cer", "b.cer"]
        );
        assert!(!result.has_failure_for_current_location());
    }

    #[test]
    fn duplicate_checks_are_recorded_once() {
        let mut result = ValidationResult::new();
        result.set_location("a.cer");
        result.is_true(true, keys::CERT_SIGNATURE_VALID);
        result.is_true(true, keys::CERT_SIGNATURE_VALID);
        result.is_true_with(
            true, keys::CERT_SIGNATURE_VALID, ["different params"]
        );
        assert_eq!(result.get_checks("a.cer").unwrap().len(), 2);
    }

    #[test]
    fn unvisited_location_is_an_error() {
        let mut result = ValidationResult::new();
        result.set_location("a.cer");
        assert!(result.get_failures("b.cer").is_err());
        assert!(result.get_failures("").is_err());
        assert!(result.get_result("b.cer", keys::ROOT_IS_TA).is_err());
        assert!(!result.has_failure_for_location("b.cer"));
    }

    #[test]
    #[should_panic(expected = "without a current location")]
    fn recording_without_location_panics() {
        ValidationResult::new().is_true(true, keys::ROOT_IS_TA);
    }

    #[test]
    fn check_equality_ignores_params() {
        let a = ValidationCheck::new(
            ValidationStatus::Failure, keys::ROOT_IS_TA, Vec::new()
        );
        let b = ValidationCheck::new(
            ValidationStatus::Failure, keys::ROOT_IS_TA,
            vec!["param".into()]
        );
        let c = ValidationCheck::new(
            ValidationStatus::Ok, keys::ROOT_IS_TA, Vec::new()
        );
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn warnings_are_not_failures() {
        let mut result = ValidationResult::new();
        result.set_location("a.cer");
        assert!(result.warn_if(true, keys::CERT_CHAIN_LENGTH));
        assert!(!result.has_failures());
        assert_eq!(
            result.get_result(
                "a.cer", keys::CERT_CHAIN_LENGTH
            ).unwrap().unwrap().status(),
            ValidationStatus::Warning
        );
    }
}
