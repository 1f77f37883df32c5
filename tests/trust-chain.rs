//! End-to-end test walking a delegation chain and a provisioning exchange.
//!
//! Builds a three-level CA hierarchy with softsigner keys, validates the
//! leaf bottom-up against the root as trust anchor, and then wraps a
//! provisioning message signed under the leaf into a CMS object and checks
//! that the received copy parses, verifies, and chains up as well.

use bytes::Bytes;
use rpki_trust::cert::{Cert, KeyUsage, TbsCert};
use rpki_trust::crl::{Crl, RevokedCertificates, TbsCertList};
use rpki_trust::crypto::{PublicKey, Signer};
use rpki_trust::crypto::softsigner::{KeyId, OpenSslSigner};
use rpki_trust::provisioning::{
    ProvisioningCmsObjectBuilder, ProvisioningCmsObjectParser,
};
use rpki_trust::resources::{ResourceSet, Resources};
use rpki_trust::validation::{keys, ValidationResult};
use rpki_trust::validators::{
    BottomUpValidator, RepositoryObject, ResourceCertificateLocator,
};
use rpki_trust::x509::{Serial, Time, Validity};

const PAYLOAD: &str
    = "<message type=\"issue\" sender=\"child\" recipient=\"parent\"/>";

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

    fn add_ca(
        &mut self, issuer: Option<usize>, resources: Resources,
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
            RevokedCertificates::empty(),
            Some(pub_key.key_identifier()),
            Serial::from(1u64),
        ).into_crl(&self.signer, &key).unwrap();
        self.cas.push(TestCa { cert, crl, key, pub_key });
        self.cas.len() - 1
    }

    /// Issues an end-entity certificate under the CA at `issuer`.
    fn issue_ee(&self, issuer: usize) -> (Cert, KeyId) {
        let key = self.signer.create_key().unwrap();
        let pub_key = self.signer.get_key_info(&key).unwrap();
        let mut tbs = TbsCert::new(
            Serial::from(1000u64),
            self.cas[issuer].cert.subject().clone(),
            Validity::new(Time::five_minutes_ago(), Time::tomorrow()),
            None,
            pub_key,
            KeyUsage::Ee,
        );
        tbs.set_resources(Resources::Inherit);
        tbs.set_authority_key_identifier(
            Some(self.cas[issuer].pub_key.key_identifier())
        );
        let cert = tbs.into_cert(
            &self.signer, &self.cas[issuer].key
        ).unwrap();
        (cert, key)
    }

    fn issuer_of(&self, cert: &Cert) -> Option<usize> {
        if cert.is_self_issued() {
            return None
        }
        self.cas.iter().position(|ca| ca.cert.subject() == cert.issuer())
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
    Resources::Blocks(ResourceSet::from_strs(v4, "", "").unwrap())
}

fn build_repo() -> (TestRepo, usize, usize) {
    let mut repo = TestRepo::new();
    let root = repo.add_ca(None, resources("10.0.0.0/8"));
    let middle = repo.add_ca(Some(root), Resources::Inherit);
    let leaf = repo.add_ca(Some(middle), resources("10.0.0.0/16"));
    (repo, root, leaf)
}

#[test]
fn leaf_validates_against_root_anchor() {
    let (repo, root, leaf) = build_repo();

    let mut result = ValidationResult::new();
    let anchors = [repo.cas[root].cert.clone()];
    BottomUpValidator::new(&mut result, &repo, &anchors)
        .validate("leaf.cer", &repo.cas[leaf].cert);
    assert!(
        !result.has_failures(),
        "{:?}", result.get_failures("leaf.cer")
    );
    assert!(result.locations().any(|loc| loc == "ca-0.cer"));
}

#[test]
fn provisioning_reply_chains_up() {
    let (repo, root, leaf) = build_repo();
    let (ee_cert, ee_key) = repo.issue_ee(leaf);
    let crl = repo.cas[leaf].crl.clone();

    let object = ProvisioningCmsObjectBuilder::new()
        .with_certificate(ee_cert)
        .with_crl(crl)
        .with_payload(PAYLOAD)
        .build(&repo.signer, &ee_key)
        .unwrap();

    // The recipient only sees the bytes.
    let received = object.to_captured().into_bytes();
    let mut result = ValidationResult::new();
    let parsed = ProvisioningCmsObjectParser::new(&mut result)
        .parse("reply.cms", received)
        .unwrap();
    assert!(!result.has_failures());
    assert_eq!(parsed.payload().as_ref(), PAYLOAD.as_bytes());
    assert_eq!(parsed, object);

    // The embedded certificate must chain up to the trust anchor.
    let anchors = [repo.cas[root].cert.clone()];
    BottomUpValidator::new(&mut result, &repo, &anchors)
        .validate("reply-ee.cer", parsed.ee_cert());
    assert!(
        !result.has_failures(),
        "{:?}", result.get_failures("reply-ee.cer")
    );
}

#[test]
fn tampered_reply_is_rejected() {
    let (repo, _, leaf) = build_repo();
    let (ee_cert, ee_key) = repo.issue_ee(leaf);
    let crl = repo.cas[leaf].crl.clone();

    let object = ProvisioningCmsObjectBuilder::new()
        .with_certificate(ee_cert)
        .with_crl(crl)
        .with_payload(PAYLOAD)
        .build(&repo.signer, &ee_key)
        .unwrap();

    let mut data = object.to_captured().into_bytes().to_vec();
    let pos = data.windows(PAYLOAD.len()).position(|window| {
        window == PAYLOAD.as_bytes()
    }).unwrap();
    data[pos] ^= 0x01;

    let mut result = ValidationResult::new();
    let parsed = ProvisioningCmsObjectParser::new(&mut result)
        .parse("reply.cms", Bytes::from(data));
    assert!(parsed.is_none());
    assert!(result.has_failures_for_location_and_key(
        "reply.cms", keys::CMS_SIGNATURE
    ));
}
