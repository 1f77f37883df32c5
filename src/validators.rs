//! Validating certificate chains bottom-up.
//!
//! The validators in this module establish whether a resource certificate
//! is trustworthy: the [`CrlValidator`] checks a revocation list against
//! the key of its issuer, the [`ParentChildValidator`] checks one
//! certificate against its immediate issuer, and the [`BottomUpValidator`]
//! resolves the full ancestor chain of a certificate via a
//! [`ResourceCertificateLocator`] and drives the parent-child validation
//! down the chain while threading resource inheritance.
//!
//! None of the validators return errors. Everything they find is recorded
//! in the [`ValidationResult`][crate::validation::ValidationResult] they
//! are given.

use bytes::Bytes;
use log::debug;
use crate::cert::Cert;
use crate::crl::Crl;
use crate::crypto::PublicKey;
use crate::resources::{ResourceSet, Resources};
use crate::validation::{keys, ValidationResult};
use crate::x509::Time;


//------------ Configuration -------------------------------------------------

/// The maximum number of certificates in a chain.
///
/// Chain building stops with a failure when the chain grows beyond this
/// many certificates. The bound keeps a cyclic or maliciously deep
/// ancestry from blocking validation forever.
pub const MAX_CHAIN_LENGTH: usize = 30;


//------------ RepositoryObject ----------------------------------------------

/// An object resolved from a repository by a locator.
#[derive(Clone, Debug)]
pub struct RepositoryObject {
    /// The name of the object, used as its validation location.
    pub name: String,

    /// The raw content of the object.
    pub content: Bytes,
}

impl RepositoryObject {
    /// Creates a new object from its name and content.
    pub fn new(name: impl Into<String>, content: Bytes) -> Self {
        Self { name: name.into(), content }
    }
}


//------------ ResourceCertificateLocator ------------------------------------

/// Resolving the context of a certificate under validation.
///
/// The chain validator uses a locator to find the issuing certificate and
/// the revocation list of a certificate. Both lookups return `None` when
/// no such object exists which for the parent lookup signals that the
/// chain is complete.
///
/// A locator returns already-fetched bytes. The validators never retry a
/// lookup and do not cache its result.
pub trait ResourceCertificateLocator {
    /// Returns the certificate of the issuer of `cert` if there is one.
    fn find_parent(&self, cert: &Cert) -> Option<RepositoryObject>;

    /// Returns the CRL covering `cert` if there is one.
    fn find_crl(&self, cert: &Cert) -> Option<RepositoryObject>;
}


//------------ CrlValidator --------------------------------------------------

/// Validates a certificate revocation list against its issuer’s key.
pub struct CrlValidator<'a> {
    result: &'a mut ValidationResult,
}

impl<'a> CrlValidator<'a> {
    /// Creates a new validator recording into `result`.
    pub fn new(result: &'a mut ValidationResult) -> Self {
        Self { result }
    }

    /// Validates a CRL.
    ///
    /// Checks the signature against `issuer_key` and that the next update
    /// of the list hasn’t passed yet. A stale list is recorded as a
    /// failure, not rejected outright. The caller decides how to treat it.
    pub fn validate(
        &mut self, location: &str, crl: &Crl, issuer_key: &PublicKey
    ) {
        self.validate_at(location, crl, issuer_key, Time::now())
    }

    /// Validates a CRL at the given point in time.
    pub fn validate_at(
        &mut self, location: &str, crl: &Crl, issuer_key: &PublicKey,
        now: Time,
    ) {
        self.result.set_location(location);
        self.result.is_true(
            crl.verify_signature(issuer_key).is_ok(),
            keys::CRL_SIGNATURE_VALID
        );
        self.result.is_true_with(
            crl.next_update() > now,
            keys::CRL_NEXT_UPDATE_BEFORE_NOW,
            [crl.next_update().to_string()]
        );
    }
}


//------------ ParentChildValidator ------------------------------------------

/// Validates one certificate against its immediate issuer.
pub struct ParentChildValidator<'a> {
    result: &'a mut ValidationResult,
}

impl<'a> ParentChildValidator<'a> {
    /// Creates a new validator recording into `result`.
    pub fn new(result: &'a mut ValidationResult) -> Self {
        Self { result }
    }

    /// Validates `child` as issued by `parent`.
    ///
    /// Checks the issuer name linkage, the signature, the validity
    /// period, revocation via `crl`, and that the resources of the child
    /// are held by `parent_resources`, the effective resource set of the
    /// parent. A missing CRL is a failure unless the child is self-issued.
    pub fn validate(
        &mut self,
        location: &str,
        child: &Cert,
        parent: &Cert,
        crl: Option<&Crl>,
        parent_resources: &ResourceSet,
    ) {
        self.validate_at(
            location, child, parent, crl, parent_resources, Time::now()
        )
    }

    /// Validates `child` as issued by `parent` at the given time.
    pub fn validate_at(
        &mut self,
        location: &str,
        child: &Cert,
        parent: &Cert,
        crl: Option<&Crl>,
        parent_resources: &ResourceSet,
        now: Time,
    ) {
        self.result.set_location(location);
        self.result.is_true(
            child.issuer() == parent.subject(),
            keys::CERT_ISSUER_IS_PARENT
        );
        self.result.is_true(
            child.verify_signature(
                parent.subject_public_key_info()
            ).is_ok(),
            keys::CERT_SIGNATURE_VALID
        );
        self.result.is_true(
            child.validity().not_before() <= now,
            keys::CERT_NOT_VALID_BEFORE
        );
        self.result.is_true(
            child.validity().not_after() >= now,
            keys::CERT_NOT_VALID_AFTER
        );
        if !child.is_self_issued() || crl.is_some() {
            if let Some(crl) = self.result.not_none(
                crl, keys::CRL_REQUIRED
            ) {
                self.result.is_true_with(
                    !crl.contains(child.serial_number()),
                    keys::CERT_NOT_REVOKED,
                    [child.serial_number().to_string()]
                );
            }
        }
        if let Resources::Blocks(set) = child.resources() {
            self.result.is_true_with(
                parent_resources.contains(set),
                keys::CERT_RESOURCE_SET_NOT_HELD_BY_PARENT,
                [set.to_string()]
            );
        }
    }
}


//------------ BottomUpValidator ---------------------------------------------

/// Validates a certificate by resolving its chain up to a trust anchor.
///
/// The validator first builds the full chain from the certificate to a
/// self-issued root by repeatedly asking the locator for the issuing
/// certificate. Failures during this phase abort the validation since the
/// shape of the chain is a prerequisite for everything else. Once the
/// chain stands, every parent-child link is validated top-down and all
/// failures are collected. A failure at one link does not stop validation
/// of the links below it.
pub struct BottomUpValidator<'a, L> {
    result: &'a mut ValidationResult,
    locator: &'a L,
    trust_anchors: &'a [Cert],
}

impl<'a, L: ResourceCertificateLocator> BottomUpValidator<'a, L> {
    /// Creates a new validator.
    ///
    /// An empty `trust_anchors` slice means any self-issued root is
    /// accepted. This is only useful for checking the shape of a chain.
    pub fn new(
        result: &'a mut ValidationResult,
        locator: &'a L,
        trust_anchors: &'a [Cert],
    ) -> Self {
        Self { result, locator, trust_anchors }
    }

    /// Validates the certificate at the given location.
    pub fn validate(&mut self, location: &str, cert: &Cert) {
        self.result.set_location(location);
        let chain = match self.build_chain(location, cert) {
            Some(chain) => chain,
            None => return,
        };
        if !self.check_root(&chain) {
            return
        }
        self.validate_chain(&chain)
    }

    /// Builds the chain from the certificate up to a self-issued root.
    ///
    /// The returned chain is ordered root first. Returns `None` if the
    /// chain cannot be completed within the length bound.
    fn build_chain(
        &mut self, location: &str, cert: &Cert
    ) -> Option<Vec<(String, Cert)>> {
        let mut chain = vec![(location.to_string(), cert.clone())];
        while !chain[0].1.is_self_issued() {
            let parent = match self.locator.find_parent(&chain[0].1) {
                Some(parent) => parent,
                None => {
                    self.result.set_location(chain[0].0.clone());
                    self.result.is_true(false, keys::CERT_CHAIN_COMPLETE);
                    return None
                }
            };
            self.result.set_location(parent.name.clone());
            let parent_cert = match Cert::decode(parent.content.clone()) {
                Ok(cert) => cert,
                Err(err) => {
                    debug!(
                        "failed to decode certificate {}: {}",
                        parent.name, err
                    );
                    self.result.is_true(false, keys::CERT_PARSED);
                    return None
                }
            };
            chain.insert(0, (parent.name, parent_cert));
            if !self.result.is_true_with(
                chain.len() <= MAX_CHAIN_LENGTH,
                keys::CERT_CHAIN_LENGTH,
                [MAX_CHAIN_LENGTH.to_string()]
            ) {
                return None
            }
        }
        Some(chain)
    }

    /// Checks the root of the chain against the trust anchors.
    fn check_root(&mut self, chain: &[(String, Cert)]) -> bool {
        let (location, root) = &chain[0];
        if self.trust_anchors.is_empty() {
            debug!("no trust anchors given, accepting root {}", location);
            return true
        }
        self.result.set_location(location.clone());
        self.result.is_true(
            self.trust_anchors.iter().any(|anchor| anchor == root),
            keys::ROOT_IS_TA
        )
    }

    /// Validates every link of the chain, root excluded.
    ///
    /// The effective resource set of the root is its own explicit set.
    /// An inherited root set resolves to the empty set so nothing below
    /// it can claim resources through it.
    fn validate_chain(&mut self, chain: &[(String, Cert)]) {
        let empty = ResourceSet::empty();
        let mut effective
            = chain[0].1.resources().resolve(&empty).clone();
        for pair in chain.windows(2) {
            let (_, parent) = &pair[0];
            let (child_location, child) = &pair[1];
            let crl = self.fetch_crl(parent, child);
            ParentChildValidator::new(self.result).validate(
                child_location, child, parent, crl.as_ref(), &effective
            );
            effective = child.resources().resolve(&effective).clone();
        }
    }

    /// Resolves and validates the CRL covering `child`.
    fn fetch_crl(&mut self, parent: &Cert, child: &Cert) -> Option<Crl> {
        let object = self.locator.find_crl(child)?;
        self.result.set_location(object.name.clone());
        let crl = match Crl::decode(object.content.clone()) {
            Ok(crl) => crl,
            Err(err) => {
                debug!("failed to decode CRL {}: {}", object.name, err);
                self.result.is_true(false, keys::CRL_PARSED);
                return None
            }
        };
        CrlValidator::new(self.result).validate(
            &object.name, &crl, parent.subject_public_key_info()
        );
        Some(crl)
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::cert::{KeyUsage, TbsCert};
    use crate::crl::{CrlEntry, RevokedCertificates, TbsCertList};
    use crate::crypto::Signer;
    use crate::crypto::softsigner::{KeyId, OpenSslSigner};
    use crate::x509::{Serial, Time, Validity};

    /// A CA for tests: its signed certificate, CRL, and signing key.
    struct TestCa {
        cert: Cert,
        crl: Crl,
        key: KeyId,
        pub_key: PublicKey,
    }

    struct TestRepo {
        signer: OpenSslSigner,
        cas: Vec<TestCa>,
    }

    impl TestRepo {
        fn new() -> Self {
            Self { signer: OpenSslSigner::new(), cas: Vec::new() }
        }

        /// Adds a CA issued by the CA at `issuer`, or self-issued.
        fn add_ca(
            &mut self,
            issuer: Option<usize>,
            resources: Resources,
            revoked: Vec<CrlEntry>,
        ) -> usize {
            let key = self.signer.create_key().unwrap();
            let pub_key = self.signer.get_key_info(&key).unwrap();
            let mut tbs = TbsCert::new(
                Serial::from(self.cas.len() as u64 + 1),
                match issuer {
                    Some(idx) => self.cas[idx].cert.subject().clone(),
                    None => pub_key.to_subject_name(),
                },
                Validity::new(Time::five_minutes_ago(), Time::next_week()),
                None,
                pub_key.clone(),
                KeyUsage::Ca,
            );
            tbs.set_basic_ca(Some(true));
            tbs.set_resources(resources);
            let signing_key = match issuer {
                Some(idx) => {
                    tbs.set_authority_key_identifier(
                        Some(self.cas[idx].pub_key.key_identifier())
                    );
                    self.cas[idx].key
                }
                None => key,
            };
            let cert = tbs.into_cert(&self.signer, &signing_key).unwrap();
            let crl = TbsCertList::new(
                cert.subject().clone(),
                Time::now(),
                Time::tomorrow(),
                RevokedCertificates::from_iter(revoked),
                Some(pub_key.key_identifier()),
                Serial::from(1u64),
            ).into_crl(&self.signer, &key).unwrap();
            self.cas.push(TestCa { cert, crl, key, pub_key });
            self.cas.len() - 1
        }

        fn cert(&self, idx: usize) -> &Cert {
            &self.cas[idx].cert
        }

        /// Returns the index of the CA that issued `cert`.
        fn issuer_of(&self, cert: &Cert) -> Option<usize> {
            if cert.is_self_issued() {
                return None
            }
            self.cas.iter().position(|ca| {
                ca.cert.subject() == cert.issuer()
            })
        }
    }

    impl ResourceCertificateLocator for TestRepo {
        fn find_parent(&self, cert: &Cert) -> Option<RepositoryObject> {
            let idx = self.issuer_of(cert)?;
            Some(RepositoryObject::new(
                format!("ca-{}.cer", idx),
                self.cas[idx].cert.to_captured().into_bytes(),
            ))
        }

        fn find_crl(&self, cert: &Cert) -> Option<RepositoryObject> {
            let idx = self.issuer_of(cert)?;
            Some(RepositoryObject::new(
                format!("ca-{}.crl", idx),
                self.cas[idx].crl.to_captured().into_bytes(),
            ))
        }
    }

    fn resources(v4: &str) -> Resources {
        Resources::Blocks(
            ResourceSet::from_strs(v4, "", "").unwrap()
        )
    }

    #[test]
    fn chain_with_inherited_resources_validates() {
        let mut repo = TestRepo::new();
        let root = repo.add_ca(None, resources("10.0.0.0/8"), Vec::new());
        let b = repo.add_ca(Some(root), Resources::Inherit, Vec::new());
        let c = repo.add_ca(Some(b), resources("10.0.0.0/16"), Vec::new());

        let mut result = ValidationResult::new();
        let anchors = [repo.cert(root).clone()];
        BottomUpValidator::new(&mut result, &repo, &anchors)
            .validate("c.cer", repo.cert(c));
        assert!(
            !result.has_failures(),
            "{:?}", result.get_failures("c.cer")
        );
    }

    #[test]
    fn consecutive_inherited_links_resolve_transitively() {
        let mut repo = TestRepo::new();
        let root = repo.add_ca(None, resources("10.0.0.0/8"), Vec::new());
        let b = repo.add_ca(Some(root), Resources::Inherit, Vec::new());
        let c = repo.add_ca(Some(b), Resources::Inherit, Vec::new());
        let leaf = repo.add_ca(Some(c), resources("10.0.0.0/16"), Vec::new());

        let mut result = ValidationResult::new();
        let anchors = [repo.cert(root).clone()];
        BottomUpValidator::new(&mut result, &repo, &anchors)
            .validate("leaf.cer", repo.cert(leaf));
        // The root's explicit set must carry through both inheriting
        // intermediates for the leaf's containment check to pass.
        assert!(
            !result.has_failures(),
            "{:?}", result.get_failures("leaf.cer")
        );
    }

    #[test]
    fn wrong_trust_anchor_fails() {
        let mut repo = TestRepo::new();
        let root = repo.add_ca(None, resources("10.0.0.0/8"), Vec::new());
        let child = repo.add_ca(
            Some(root), Resources::Inherit, Vec::new()
        );
        let other = repo.add_ca(None, resources("192.0.2.0/24"), Vec::new());

        let mut result = ValidationResult::new();
        let anchors = [repo.cert(other).clone()];
        BottomUpValidator::new(&mut result, &repo, &anchors)
            .validate("child.cer", repo.cert(child));
        assert!(result.has_failures_for_location_and_key(
            "ca-0.cer", keys::ROOT_IS_TA
        ));
    }

    #[test]
    fn resources_not_held_by_parent_fail() {
        let mut repo = TestRepo::new();
        let root = repo.add_ca(None, resources("10.0.0.0/8"), Vec::new());
        let child = repo.add_ca(
            Some(root), resources("192.0.2.0/24"), Vec::new()
        );

        let mut result = ValidationResult::new();
        BottomUpValidator::new(&mut result, &repo, &[])
            .validate("child.cer", repo.cert(child));
        assert!(result.has_failures_for_location_and_key(
            "child.cer", keys::CERT_RESOURCE_SET_NOT_HELD_BY_PARENT
        ));
        assert!(!result.has_failures_for_location_and_key(
            "child.cer", keys::CERT_SIGNATURE_VALID
        ));
    }

    #[test]
    fn revoked_certificate_fails() {
        let mut repo = TestRepo::new();
        let root = repo.add_ca(
            None, resources("10.0.0.0/8"),
            vec![CrlEntry::new(Serial::from(2u64), Time::now())],
        );
        let child = repo.add_ca(
            Some(root), Resources::Inherit, Vec::new()
        );
        assert_eq!(repo.cert(child).serial_number(), Serial::from(2u64));

        let mut result = ValidationResult::new();
        BottomUpValidator::new(&mut result, &repo, &[])
            .validate("child.cer", repo.cert(child));
        assert!(result.has_failures_for_location_and_key(
            "child.cer", keys::CERT_NOT_REVOKED
        ));
    }

    #[test]
    fn stale_crl_fails_freshness_only() {
        let signer = OpenSslSigner::new();
        let key = signer.create_key().unwrap();
        let pub_key = signer.get_key_info(&key).unwrap();
        let crl = TbsCertList::new(
            pub_key.to_subject_name(),
            Time::one_hour_ago(),
            Time::one_hour_ago(),
            RevokedCertificates::empty(),
            Some(pub_key.key_identifier()),
            Serial::from(1u64),
        ).into_crl(&signer, &key).unwrap();

        let mut result = ValidationResult::new();
        CrlValidator::new(&mut result).validate(
            "stale.crl", &crl, &pub_key
        );
        let failures = result.get_failures("stale.crl").unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].key(), keys::CRL_NEXT_UPDATE_BEFORE_NOW
        );
    }

    #[test]
    fn missing_parent_is_incomplete_chain() {
        let mut repo = TestRepo::new();
        let root = repo.add_ca(None, resources("10.0.0.0/8"), Vec::new());
        let child = repo.add_ca(
            Some(root), Resources::Inherit, Vec::new()
        );
        let orphan = repo.cert(child).clone();
        repo.cas.remove(root);

        let mut result = ValidationResult::new();
        BottomUpValidator::new(&mut result, &repo, &[])
            .validate("orphan.cer", &orphan);
        assert!(result.has_failures_for_location_and_key(
            "orphan.cer", keys::CERT_CHAIN_COMPLETE
        ));
    }

    #[test]
    fn overlong_chain_fails_while_building() {
        let mut repo = TestRepo::new();
        let mut idx = repo.add_ca(
            None, resources("10.0.0.0/8"), Vec::new()
        );
        for _ in 0..MAX_CHAIN_LENGTH {
            idx = repo.add_ca(Some(idx), Resources::Inherit, Vec::new());
        }

        let mut result = ValidationResult::new();
        BottomUpValidator::new(&mut result, &repo, &[])
            .validate("leaf.cer", repo.cert(idx));
        // The bound is hit when the root gets prepended.
        assert!(result.has_failures_for_location_and_key(
            "ca-0.cer", keys::CERT_CHAIN_LENGTH
        ));
        // Chain building aborted, so no link was validated.
        assert!(!result.has_failure_for_location("leaf.cer"));
    }
}
