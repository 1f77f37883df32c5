//! CMS objects of the provisioning protocol.
//!
//! The provisioning protocol of [RFC 6492], also known as the up-down
//! protocol, exchanges its messages as signed CMS objects. This module
//! provides [`ProvisioningCmsObject`] for such an object together with the
//! only two ways of producing one: [`ProvisioningCmsObjectBuilder`] signs a
//! payload into a fresh object and [`ProvisioningCmsObjectParser`] decodes
//! and verifies an object received from an untrusted source, recording
//! everything it finds into a
//! [`ValidationResult`][crate::validation::ValidationResult].
//!
//! [RFC 6492]: https://tools.ietf.org/html/rfc6492

use std::{cmp, fmt, io};
use bcder::{decode, encode};
use bcder::{Captured, Mode, OctetString, Oid, Tag};
use bcder::decode::{DecodeError, IntoSource, Source};
use bcder::encode::PrimitiveContent;
use bytes::Bytes;
use log::debug;
use crate::cert::Cert;
use crate::crl::Crl;
use crate::crypto::{
    Digest, DigestAlgorithm, KeyIdentifier, RpkiSignature,
    RpkiSignatureAlgorithm, Signer, SigningError,
};
use crate::error::VerificationError;
use crate::oid;
use crate::validation::{keys, ValidationResult};
use crate::x509::Time;


//------------ ProvisioningCmsObject -----------------------------------------

/// A signed provisioning protocol message.
///
/// The object wraps a textual payload in a CMS SignedData structure
/// together with the certificate of the end-entity key that signed it and
/// the CRL of the issuing authority.
///
/// Values of this type only come out of the builder or the parser, so a
/// value is always structurally consistent and carries both the embedded
/// certificate and the CRL.
#[derive(Clone, Debug)]
pub struct ProvisioningCmsObject {
    /// The digest algorithm for the message digest attribute.
    digest_algorithm: DigestAlgorithm,

    /// The content type of the encapsulated payload.
    content_type: Oid<Bytes>,

    /// The payload itself.
    content: OctetString,

    /// The certificate of the key the object was signed with.
    ee_cert: Cert,

    /// The CRL of the authority that issued the certificate.
    crl: Crl,

    /// The signer identifier.
    ///
    /// Must match the subject key identifier of the certificate.
    sid: KeyIdentifier,

    /// The raw signed attributes covered by the signature.
    signed_attrs: SignedAttrs,

    /// The signature over the signed attributes.
    signature: RpkiSignature,

    /// The message digest from the signed attributes.
    message_digest: MessageDigest,

    /// The signing time from the signed attributes.
    signing_time: Time,
}

/// # Data Access
///
impl ProvisioningCmsObject {
    /// Returns a reference to the content type of the payload.
    pub fn content_type(&self) -> &Oid<Bytes> {
        &self.content_type
    }

    /// Returns a reference to the raw payload.
    pub fn content(&self) -> &OctetString {
        &self.content
    }

    /// Returns the payload as a bytes value.
    pub fn payload(&self) -> Bytes {
        self.content.to_bytes()
    }

    /// Returns a reference to the embedded certificate.
    pub fn ee_cert(&self) -> &Cert {
        &self.ee_cert
    }

    /// Returns a reference to the embedded CRL.
    pub fn crl(&self) -> &Crl {
        &self.crl
    }

    /// Returns the time the object was signed.
    pub fn signing_time(&self) -> Time {
        self.signing_time
    }

    /// Returns the message digest from the signed attributes.
    pub fn message_digest(&self) -> &MessageDigest {
        &self.message_digest
    }
}

/// # Encoding
///
impl ProvisioningCmsObject {
    /// Returns a value encoder for a reference to the object.
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        encode::sequence((
            oid::SIGNED_DATA.encode(), // outer contentType
            encode::sequence_as(Tag::CTX_0,
                encode::sequence((
                    3u8.encode(), // version
                    self.digest_algorithm.encode_set(),
                    encode::sequence(( // encapContentInfo
                        self.content_type.encode_ref(),
                        encode::sequence_as(Tag::CTX_0,
                            self.content.encode_ref()
                        ),
                    )),
                    encode::sequence_as(Tag::CTX_0, // certificates
                        self.ee_cert.encode_ref(),
                    ),
                    encode::sequence_as(Tag::CTX_1, // crls
                        self.crl.encode_ref(),
                    ),
                    encode::set( // signerInfos
                        encode::sequence((
                            3u8.encode(), // version
                            self.sid.encode_ref_as(Tag::CTX_0),
                            self.digest_algorithm.encode(),
                            self.signed_attrs.encode_ref(),
                            self.signature.algorithm().cms_encode(),
                            OctetString::encode_slice(
                                self.signature.value().as_ref()
                            ),
                            // no unsignedAttrs
                        ))
                    )
                ))
            )
        ))
    }

    /// Returns a captured encoding of the object.
    ///
    /// The capture happens in BER mode so that objects recovered by the
    /// parser, whose captured parts carry the mode they were received in,
    /// re-encode to exactly the bytes they were parsed from. Objects made
    /// by the builder consist of DER parts only and encode to DER.
    pub fn to_captured(&self) -> Captured {
        Captured::from_values(Mode::Ber, self.encode_ref())
    }
}


//--- PartialEq and Eq

impl PartialEq for ProvisioningCmsObject {
    /// Equality of two objects is equality of their encoding.
    fn eq(&self, other: &Self) -> bool {
        self.to_captured().as_slice() == other.to_captured().as_slice()
    }
}

impl Eq for ProvisioningCmsObject {}


//------------ ProvisioningCmsObjectBuilder ----------------------------------

/// Builds and signs a new provisioning CMS object.
///
/// The builder needs the certificate of the signing key, the CRL of its
/// issuer, and a non-empty payload. Missing any of them fails the build
/// right away. A successful build has already been round-tripped through
/// the parser, so the returned object is known to re-parse to itself.
#[derive(Clone, Debug, Default)]
pub struct ProvisioningCmsObjectBuilder {
    ee_cert: Option<Cert>,
    crl: Option<Crl>,
    payload: Option<String>,
}

impl ProvisioningCmsObjectBuilder {
    /// Creates a new, empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the certificate of the signing key.
    pub fn with_certificate(mut self, ee_cert: Cert) -> Self {
        self.ee_cert = Some(ee_cert);
        self
    }

    /// Sets the CRL of the authority that issued the certificate.
    pub fn with_crl(mut self, crl: Crl) -> Self {
        self.crl = Some(crl);
        self
    }

    /// Sets the payload text.
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Signs the payload with the given key and assembles the object.
    ///
    /// The key must be the one the certificate was issued for. The
    /// assembled object is encoded and parsed back before it is returned.
    pub fn build<S: Signer>(
        self, signer: &S, key: &S::KeyId,
    ) -> Result<ProvisioningCmsObject, BuildError<S::Error>> {
        let ee_cert = self.ee_cert.ok_or(BuildError::MissingCertificate)?;
        let crl = self.crl.ok_or(BuildError::MissingCrl)?;
        let payload = match self.payload {
            Some(payload) if !payload.is_empty() => payload,
            _ => return Err(BuildError::EmptyPayload),
        };
        let data = Bytes::from(payload);

        let digest_algorithm = DigestAlgorithm::sha256();
        let content_type = Oid(
            Bytes::from_static(oid::PROVISIONING_CONTENT_TYPE.0)
        );
        let message_digest = digest_algorithm.digest(&data).into();
        let signing_time = Time::now();
        let signed_attrs = SignedAttrs::new(
            &content_type, &message_digest, signing_time
        );
        let signature = signer.sign(key, &signed_attrs.encode_verify())?;

        let object = ProvisioningCmsObject {
            digest_algorithm,
            content_type,
            content: OctetString::new(data),
            sid: ee_cert.subject_key_identifier(),
            ee_cert,
            crl,
            signed_attrs,
            signature,
            message_digest,
            signing_time,
        };

        // Parse our own encoding back. An object that does not survive
        // this would be unusable for the recipient, so it must never
        // leave the builder. The object handed out is the assembled one,
        // all of whose parts are DER.
        let encoded = object.to_captured();
        let mut result = ValidationResult::new();
        let parsed = ProvisioningCmsObjectParser::new(&mut result).parse(
            "<built object>", encoded.into_bytes()
        );
        match parsed {
            Some(_) if !result.has_failures() => Ok(object),
            _ => Err(BuildError::RoundTrip)
        }
    }
}


//------------ ProvisioningCmsObjectParser -----------------------------------

/// Parses and verifies a provisioning CMS object from untrusted bytes.
///
/// Everything the parser finds is recorded under the location it is given,
/// with a distinct key per cause: undecodable ASN.1, wrong content type,
/// missing certificate, missing CRL, and signature mismatch each record
/// their own check. The returned object must only be used after checking
/// that the result carries no failures.
pub struct ProvisioningCmsObjectParser<'a> {
    result: &'a mut ValidationResult,
}

impl<'a> ProvisioningCmsObjectParser<'a> {
    /// Creates a new parser recording into `result`.
    pub fn new(result: &'a mut ValidationResult) -> Self {
        Self { result }
    }

    /// Parses an object from the given bytes.
    pub fn parse(
        &mut self, location: &str, data: Bytes
    ) -> Option<ProvisioningCmsObject> {
        self.result.set_location(location);
        let mut raw = match RawCms::decode(data) {
            Ok(raw) => raw,
            Err(err) => {
                debug!("failed to decode CMS at {}: {}", location, err);
                self.result.is_true(false, keys::CMS_DATA_PARSING);
                return None
            }
        };
        self.result.is_true(true, keys::CMS_DATA_PARSING);
        let content_type_ok = self.result.is_true(
            raw.content_type == oid::PROVISIONING_CONTENT_TYPE,
            keys::CMS_CONTENT_TYPE
        );
        let ee_cert = self.result.not_none(
            raw.ee_cert.take(), keys::CMS_SIGNER_CERTIFICATE
        );
        let crl = self.result.not_none(raw.crl.take(), keys::CMS_CRL);
        let signature_ok = match ee_cert.as_ref() {
            Some(ee_cert) => {
                self.result.is_true(
                    raw.verify(ee_cert).is_ok(), keys::CMS_SIGNATURE
                )
            }
            None => false,
        };
        if !content_type_ok || !signature_ok {
            return None
        }
        let (ee_cert, crl) = match (ee_cert, crl) {
            (Some(ee_cert), Some(crl)) => (ee_cert, crl),
            _ => return None,
        };
        Some(ProvisioningCmsObject {
            digest_algorithm: raw.digest_algorithm,
            content_type: raw.content_type,
            content: raw.content,
            ee_cert,
            crl,
            sid: raw.sid,
            signed_attrs: raw.signed_attrs,
            signature: raw.signature,
            message_digest: raw.message_digest,
            signing_time: raw.signing_time,
        })
    }
}


//------------ RawCms --------------------------------------------------------

/// A decoded but unverified CMS structure.
///
/// This keeps the certificate and CRL optional so their absence can be
/// reported as its own failure instead of a generic decode error.
struct RawCms {
    digest_algorithm: DigestAlgorithm,
    content_type: Oid<Bytes>,
    content: OctetString,
    ee_cert: Option<Cert>,
    crl: Option<Crl>,
    sid: KeyIdentifier,
    signed_attrs: SignedAttrs,
    signature: RpkiSignature,
    message_digest: MessageDigest,
    signing_time: Time,
}

impl RawCms {
    /// Decodes the CMS structure from a source.
    ///
    /// Uses BER mode since peers aren’t reliably strict about DER.
    fn decode<S: IntoSource>(
        source: S,
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Ber.decode(source.into_source(), Self::take_from)
    }

    /// Takes the CMS structure from an encoded constructed value.
    fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            oid::SIGNED_DATA.skip_if(cons)?; // contentType
            cons.take_constructed_if(Tag::CTX_0, Self::take_signed_data)
        })
    }

    fn take_signed_data<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            cons.skip_u8_if(3)?; // version -- must be 3

            let digest_algorithm = DigestAlgorithm::take_set_from(cons)?;

            let (content_type, content) = cons.take_sequence(|cons| {
                // encapContentInfo
                Ok((
                    Oid::take_from(cons)?,
                    cons.take_constructed_if(
                        Tag::CTX_0,
                        OctetString::take_from
                    )?,
                ))
            })?;

            let ee_cert = cons.take_opt_constructed_if(
                Tag::CTX_0, Cert::take_from
            )?;
            let crl = cons.take_opt_constructed_if(
                Tag::CTX_1, Crl::take_from
            )?;

            let (sid, attrs, signature) = cons.take_set(|cons| {
                // signerInfos with a single SignerInfo
                cons.take_sequence(|cons| {
                    cons.skip_u8_if(3)?; // version -- must be 3
                    let sid = cons.take_value_if(
                        Tag::CTX_0, KeyIdentifier::from_content
                    )?;
                    let alg = DigestAlgorithm::take_from(cons)?;
                    if alg != digest_algorithm {
                        return Err(cons.content_err(
                            "signer digest algorithm mismatch"
                        ))
                    }
                    let attrs = SignedAttrs::take_from(cons)?;
                    if attrs.2 != content_type {
                        return Err(cons.content_err(
                            "content type in signed attributes differs"
                        ))
                    }
                    let signature = RpkiSignature::new(
                        RpkiSignatureAlgorithm::cms_take_from(cons)?,
                        OctetString::take_from(cons)?.into_bytes(),
                    );
                    // no unsignedAttrs
                    Ok((sid, attrs, signature))
                })
            })?;

            Ok(Self {
                digest_algorithm,
                content_type,
                content,
                ee_cert,
                crl,
                sid,
                signed_attrs: attrs.0,
                signature,
                message_digest: attrs.1,
                signing_time: attrs.3,
            })
        })
    }

    /// Verifies the signature of the object against the certificate.
    fn verify(&self, ee_cert: &Cert) -> Result<(), VerificationError> {
        let digest = {
            let mut context = self.digest_algorithm.start();
            self.content.iter().for_each(|x| context.update(x));
            context.finish()
        };
        if digest.as_ref() != self.message_digest.as_ref() {
            return Err(VerificationError::new(
                "message digest mismatch in signed object"
            ))
        }
        if self.sid != ee_cert.subject_key_identifier() {
            return Err(VerificationError::new(
                "subject key identifier mismatch in signed object"
            ))
        }
        ee_cert.subject_public_key_info().verify(
            &self.signed_attrs.encode_verify(), &self.signature
        ).map_err(Into::into)
    }
}


//------------ SignedAttrs ---------------------------------------------------

/// The raw signed attributes of a signer info.
///
/// The attributes in their DER encoded form are what the signature is
/// calculated over. Annoyingly, the signature covers the attribute set
/// with a tag for SET OF while the actual data has it tagged \[0\]. A value
/// of this type contains the captured content of the set without the tag
/// and length of the outer value, so both framings can be produced.
///
/// To make framing the value easy, the content is limited to 65535 octets.
#[derive(Clone, Debug)]
pub struct SignedAttrs(Captured);

impl SignedAttrs {
    /// Creates the attributes from content type, digest, and signing time.
    pub(crate) fn new(
        content_type: &Oid<impl AsRef<[u8]>>,
        digest: &MessageDigest,
        signing_time: Time,
    ) -> Self {
        // In DER encoding, the values of a SET OF are ordered by the octet
        // string of their DER encoding. All three values are SEQUENCEs, so
        // their first octet is always 0x30 and only the length octets and
        // content differ.

        let mut content_type = Some(encode::sequence((
            oid::CONTENT_TYPE.encode(),
            encode::set(
                content_type.encode_ref(),
            )
        )));
        let mut signing_time = Some(encode::sequence((
            oid::SIGNING_TIME.encode(),
            encode::set(
                signing_time.encode_varied(),
            )
        )));
        let mut message_digest = Some(encode::sequence((
            oid::MESSAGE_DIGEST.encode(),
            encode::set(
                digest.encode_ref(),
            )
        )));

        let mut len = [
            (0, StartOfValue::new(&content_type)),
            (1, StartOfValue::new(&signing_time)),
            (2, StartOfValue::new(&message_digest)),
        ];
        len.sort_by_key(|&(_, len)| len.unwrap());

        let mut res = Captured::builder(Mode::Der);
        for &(idx, _) in &len {
            match idx {
                0 => {
                    if let Some(val) = content_type.take() {
                        res.extend(val)
                    }
                }
                1 => {
                    if let Some(val) = signing_time.take() {
                        res.extend(val)
                    }
                }
                2 => {
                    if let Some(val) = message_digest.take() {
                        res.extend(val)
                    }
                }
                _ => unreachable!()
            }
        }

        SignedAttrs(res.freeze())
    }

    /// Takes the signed attributes from a constructed value.
    ///
    /// Returns the raw attributes, the message digest, the content type,
    /// and the signing time. The provisioning profile is under-specified,
    /// so unknown attributes are skipped rather than rejected.
    #[allow(clippy::type_complexity)]
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<
        (Self, MessageDigest, Oid<Bytes>, Time),
        DecodeError<S::Error>
    > {
        let mut message_digest = None;
        let mut content_type = None;
        let mut signing_time = None;
        let raw = cons.take_constructed_if(Tag::CTX_0, |cons| {
            cons.capture(|cons| {
                while let Some(()) = cons.take_opt_sequence(|cons| {
                    let oid = Oid::take_from(cons)?;
                    if oid == oid::CONTENT_TYPE {
                        Self::take_content_type(cons, &mut content_type)
                    }
                    else if oid == oid::MESSAGE_DIGEST {
                        Self::take_message_digest(cons, &mut message_digest)
                    }
                    else if oid == oid::SIGNING_TIME {
                        Self::take_signing_time(cons, &mut signing_time)
                    }
                    else {
                        cons.skip_all()
                    }
                })? { }
                Ok(())
            })
        })?;
        if raw.len() > 0xFFFF {
            return Err(cons.content_err(
                "signed attributes over 65535 bytes not supported"
            ))
        }
        let message_digest = match message_digest {
            Some(some) => MessageDigest(some.into_bytes()),
            None => {
                return Err(cons.content_err(
                    "missing message digest in signed attributes"
                ))
            }
        };
        let content_type = match content_type {
            Some(some) => some,
            None => {
                return Err(cons.content_err(
                    "missing content type in signed attributes"
                ))
            }
        };
        let signing_time = match signing_time {
            Some(some) => some,
            None => {
                return Err(cons.content_err(
                    "missing signing time in signed attributes"
                ))
            }
        };
        Ok((Self(raw), message_digest, content_type, signing_time))
    }

    /// Parses the Content Type attribute.
    ///
    /// The attribute value is a SET of exactly one OBJECT IDENTIFIER. See
    /// section 11.1 of RFC 5652.
    fn take_content_type<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        content_type: &mut Option<Oid<Bytes>>
    ) -> Result<(), DecodeError<S::Error>> {
        if content_type.is_some() {
            Err(cons.content_err("duplicate Content Type attribute"))
        }
        else {
            *content_type = Some(
                cons.take_set(|cons| Oid::take_from(cons))?
            );
            Ok(())
        }
    }

    /// Parses the Message Digest attribute.
    fn take_message_digest<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        message_digest: &mut Option<OctetString>
    ) -> Result<(), DecodeError<S::Error>> {
        if message_digest.is_some() {
            Err(cons.content_err("duplicate Message Digest attribute"))
        }
        else {
            *message_digest = Some(
                cons.take_set(|cons| OctetString::take_from(cons))?
            );
            Ok(())
        }
    }

    /// Parses the Signing Time attribute.
    fn take_signing_time<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        signing_time: &mut Option<Time>
    ) -> Result<(), DecodeError<S::Error>> {
        if signing_time.is_some() {
            Err(cons.content_err("duplicate Signing Time attribute"))
        }
        else {
            *signing_time = Some(
                cons.take_set(Time::take_from)?
            );
            Ok(())
        }
    }

    /// Returns a value encoder for the attributes tagged \[0\].
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        encode::sequence_as(Tag::CTX_0, &self.0)
    }

    /// Creates the message the signature is calculated over.
    ///
    /// This is the attribute content framed as a SET OF.
    pub fn encode_verify(&self) -> Vec<u8> {
        // The length is limited to 0xFFFF both in take_from and in new by
        // way of the payload digest and fixed-size attributes.
        let len = self.0.len();
        let mut res = Vec::with_capacity(len + 4);
        res.push(0x31); // SET
        if len < 128 {
            res.push(len as u8)
        }
        else {
            res.push(2);
            res.push((len >> 8) as u8);
            res.push(len as u8);
        }
        res.extend_from_slice(self.0.as_ref());
        res
    }
}

impl AsRef<[u8]> for SignedAttrs {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}


//------------ MessageDigest -------------------------------------------------

/// The value of the message digest attribute.
#[derive(Clone, Debug)]
pub struct MessageDigest(Bytes);

impl MessageDigest {
    /// Returns a value encoder for the digest.
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        OctetString::encode_slice(self.0.as_ref())
    }
}

impl From<Digest> for MessageDigest {
    fn from(digest: Digest) -> Self {
        MessageDigest(Bytes::copy_from_slice(digest.as_ref()))
    }
}

impl AsRef<[u8]> for MessageDigest {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}


//------------ StartOfValue --------------------------------------------------

/// Helper type for ordering signed attributes.
///
/// It keeps the first eight octets of a value which is enough to cover the
/// length.
#[derive(Clone, Copy, Debug)]
struct StartOfValue {
    res: [u8; 8],
    pos: usize,
}

impl StartOfValue {
    fn new<V: encode::Values>(values: &V) -> Self {
        let mut res = StartOfValue {
            res: [0; 8],
            pos: 0
        };
        values.write_encoded(Mode::Der, &mut res).unwrap();
        res
    }

    fn unwrap(self) -> [u8; 8] {
        self.res
    }
}

impl io::Write for StartOfValue {
    fn write(&mut self, buf: &[u8]) -> Result<usize, io::Error> {
        let slice = &mut self.res[self.pos..];
        let len = cmp::min(slice.len(), buf.len());
        slice[..len].copy_from_slice(&buf[..len]);
        self.pos += len;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), io::Error> {
        Ok(())
    }
}


//------------ BuildError ----------------------------------------------------

/// An error happened while building an object.
#[derive(Debug)]
pub enum BuildError<E> {
    /// The certificate of the signing key is missing.
    MissingCertificate,

    /// The CRL of the issuing authority is missing.
    MissingCrl,

    /// The payload is missing or empty.
    EmptyPayload,

    /// Signing failed.
    Signing(SigningError<E>),

    /// The built object did not parse back to a valid object.
    RoundTrip,
}

impl<E> From<SigningError<E>> for BuildError<E> {
    fn from(err: SigningError<E>) -> Self {
        BuildError::Signing(err)
    }
}

impl<E: fmt::Display> fmt::Display for BuildError<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BuildError::MissingCertificate => {
                f.write_str("missing signer certificate")
            }
            BuildError::MissingCrl => f.write_str("missing CRL"),
            BuildError::EmptyPayload => f.write_str("empty payload"),
            BuildError::Signing(err) => err.fmt(f),
            BuildError::RoundTrip => {
                f.write_str("built object failed to parse back")
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for BuildError<E> {}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::cert::{KeyUsage, TbsCert};
    use crate::crl::{RevokedCertificates, TbsCertList};
    use crate::crypto::softsigner::{KeyId, OpenSslSigner};
    use crate::resources::Resources;
    use crate::x509::{Serial, Validity};

    const PAYLOAD: &str
        = "<message type=\"list\" sender=\"child\" recipient=\"parent\"/>";

    /// Creates a certificate and CRL for a fresh key.
    fn make_signer_context(
        signer: &OpenSslSigner
    ) -> (Cert, Crl, KeyId) {
        let key = signer.create_key().unwrap();
        let pub_key = signer.get_key_info(&key).unwrap();
        let mut tbs = TbsCert::new(
            Serial::from(1u64),
            pub_key.to_subject_name(),
            Validity::new(Time::five_minutes_ago(), Time::tomorrow()),
            None,
            pub_key.clone(),
            KeyUsage::Ee,
        );
        tbs.set_resources(Resources::Inherit);
        let cert = tbs.into_cert(signer, &key).unwrap();
        let crl = TbsCertList::new(
            pub_key.to_subject_name(),
            Time::now(),
            Time::tomorrow(),
            RevokedCertificates::empty(),
            Some(pub_key.key_identifier()),
            Serial::from(1u64),
        ).into_crl(signer, &key).unwrap();
        (cert, crl, key)
    }

    fn build_object(signer: &OpenSslSigner) -> ProvisioningCmsObject {
        let (cert, crl, key) = make_signer_context(signer);
        ProvisioningCmsObjectBuilder::new()
            .with_certificate(cert)
            .with_crl(crl)
            .with_payload(PAYLOAD)
            .build(signer, &key)
            .unwrap()
    }

    #[test]
    fn build_then_parse_round_trips() {
        let signer = OpenSslSigner::new();
        let object = build_object(&signer);
        let mut result = ValidationResult::new();
        let parsed = ProvisioningCmsObjectParser::new(&mut result).parse(
            "reply.cms", object.to_captured().into_bytes()
        ).unwrap();
        assert!(!result.has_failures());
        assert_eq!(parsed.payload().as_ref(), PAYLOAD.as_bytes());
        assert_eq!(parsed, object);
    }

    #[test]
    fn built_and_parsed_objects_reencode_to_the_same_bytes() {
        let signer = OpenSslSigner::new();
        let object = build_object(&signer);
        let encoded = object.to_captured();
        let mut result = ValidationResult::new();
        let parsed = ProvisioningCmsObjectParser::new(&mut result).parse(
            "reply.cms", encoded.clone().into_bytes()
        ).unwrap();
        assert_eq!(object.to_captured().as_slice(), encoded.as_slice());
        assert_eq!(parsed.to_captured().as_slice(), encoded.as_slice());
    }

    #[test]
    fn tampered_payload_fails_signature_only() {
        let signer = OpenSslSigner::new();
        let object = build_object(&signer);
        let mut data = object.to_captured().into_bytes().to_vec();
        let pos = data.windows(PAYLOAD.len()).position(|window| {
            window == PAYLOAD.as_bytes()
        }).unwrap();
        data[pos] ^= 0x01;

        let mut result = ValidationResult::new();
        let parsed = ProvisioningCmsObjectParser::new(&mut result).parse(
            "reply.cms", Bytes::from(data)
        );
        assert!(parsed.is_none());
        assert!(!result.has_failures_for_location_and_key(
            "reply.cms", keys::CMS_DATA_PARSING
        ));
        assert!(result.has_failures_for_location_and_key(
            "reply.cms", keys::CMS_SIGNATURE
        ));
    }

    #[test]
    fn truncated_data_fails_parsing() {
        let signer = OpenSslSigner::new();
        let object = build_object(&signer);
        let data = object.to_captured().into_bytes();
        let data = data.slice(..data.len() / 2);

        let mut result = ValidationResult::new();
        let parsed = ProvisioningCmsObjectParser::new(&mut result).parse(
            "reply.cms", data
        );
        assert!(parsed.is_none());
        assert!(result.has_failures_for_location_and_key(
            "reply.cms", keys::CMS_DATA_PARSING
        ));
    }

    #[test]
    fn build_preconditions_fail_fast() {
        let signer = OpenSslSigner::new();
        let (cert, crl, key) = make_signer_context(&signer);

        assert!(matches!(
            ProvisioningCmsObjectBuilder::new()
                .with_crl(crl.clone())
                .with_payload(PAYLOAD)
                .build(&signer, &key),
            Err(BuildError::MissingCertificate)
        ));
        assert!(matches!(
            ProvisioningCmsObjectBuilder::new()
                .with_certificate(cert.clone())
                .with_payload(PAYLOAD)
                .build(&signer, &key),
            Err(BuildError::MissingCrl)
        ));
        assert!(matches!(
            ProvisioningCmsObjectBuilder::new()
                .with_certificate(cert)
                .with_crl(crl)
                .with_payload("")
                .build(&signer, &key),
            Err(BuildError::EmptyPayload)
        ));
    }
}
