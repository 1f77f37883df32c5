//! Resource certificates.
//!
//! The certificates used in RPKI are defined in [RFC 6487] based on the
//! general definitions in [RFC 5280]. They are X.509 certificates that are
//! extended to carry the Internet number resources of their subject via the
//! extensions defined in [RFC 3779].
//!
//! This module provides [`Cert`], the type for a decoded certificate, and
//! [`TbsCert`], the to-be-signed portion of a certificate which can also be
//! used to construct new certificates.
//!
//! [RFC 3779]: https://tools.ietf.org/html/rfc3779
//! [RFC 5280]: https://tools.ietf.org/html/rfc5280
//! [RFC 6487]: https://tools.ietf.org/html/rfc6487

use bcder::{decode, encode};
use bcder::{BitString, Captured, Mode, OctetString, Oid, Tag};
use bcder::decode::{DecodeError, IntoSource, Source};
use bcder::encode::PrimitiveContent;
use crate::crypto::{
    KeyIdentifier, PublicKey, RpkiSignatureAlgorithm,
    SignatureVerificationError, Signer, SigningError,
};
use crate::oid;
use crate::resources::{
    AddressFamily, AsResources, IpResources, ResourceSet, Resources,
    ResourcesChoice,
};
use crate::x509::{
    encode_extension, Name, Serial, SignedData, Validity,
};


//------------ Cert ----------------------------------------------------------

/// A resource certificate.
///
/// This type represents a parsed resource certificate. To perform trust
/// chain validation, use the validators in the [validators][crate::validators]
/// module which combine certificates, CRLs, and resource checks.
#[derive(Clone, Debug)]
pub struct Cert {
    /// The outer structure of the certificate.
    signed_data: SignedData,

    /// The actual data of the certificate.
    tbs: TbsCert,
}

/// # Decoding and Encoding
///
impl Cert {
    /// Decodes a source as a certificate.
    pub fn decode<S: IntoSource>(
        source: S,
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    /// Takes an encoded certificate from the beginning of a value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(Self::from_constructed)
    }

    /// Takes an optional certificate from the beginning of a value.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(Self::from_constructed)
    }

    /// Parses the content of a Certificate sequence.
    pub fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let signed_data = SignedData::from_constructed(cons)?;
        let tbs = signed_data.data().clone().decode(
            TbsCert::from_constructed
        ).map_err(DecodeError::convert)?;
        Ok(Self { signed_data, tbs })
    }

    /// Returns a value encoder for a reference to the certificate.
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        self.signed_data.encode_ref()
    }

    /// Returns a captured encoding of the certificate.
    pub fn to_captured(&self) -> Captured {
        Captured::from_values(Mode::Der, self.encode_ref())
    }
}

/// # Data Access
///
impl Cert {
    /// Returns whether the certificate is self-issued.
    ///
    /// This is the case if issuer and subject name are equal and, if an
    /// authority key identifier is present, it matches the subject key
    /// identifier.
    pub fn is_self_issued(&self) -> bool {
        self.tbs.issuer == self.tbs.subject
            && self.tbs.authority_key_identifier.map(|aki| {
                aki == self.tbs.subject_key_identifier
            }).unwrap_or(true)
    }

    /// Verifies the signature of the certificate with the given key.
    pub fn verify_signature(
        &self, public_key: &PublicKey
    ) -> Result<(), SignatureVerificationError> {
        self.signed_data.verify_signature(public_key)
    }
}


//--- Deref-like access

impl std::ops::Deref for Cert {
    type Target = TbsCert;

    fn deref(&self) -> &Self::Target {
        &self.tbs
    }
}

impl AsRef<TbsCert> for Cert {
    fn as_ref(&self) -> &TbsCert {
        &self.tbs
    }
}


//--- PartialEq and Eq

impl PartialEq for Cert {
    fn eq(&self, other: &Self) -> bool {
        self.signed_data == other.signed_data
    }
}

impl Eq for Cert {}


//------------ TbsCert -------------------------------------------------------

/// The data of a resource certificate.
#[derive(Clone, Debug)]
pub struct TbsCert {
    /// The serial number.
    serial_number: Serial,

    /// The algorithm used for signing the certificate.
    signature: RpkiSignatureAlgorithm,

    /// The name of the issuer.
    issuer: Name,

    /// The validity of the certificate.
    validity: Validity,

    /// The name of the subject of this certificate.
    subject: Name,

    /// Information about the public key of this certificate.
    subject_public_key_info: PublicKey,

    /// Basic Constraints extension.
    ///
    /// The field indicates whether the extension is present and, if so,
    /// whether the "cA" boolean is set. See 4.8.1 of RFC 6487.
    basic_ca: Option<bool>,

    /// Subject Key Identifier extension.
    subject_key_identifier: KeyIdentifier,

    /// Authority Key Identifier extension.
    authority_key_identifier: Option<KeyIdentifier>,

    /// Key Usage extension.
    key_usage: KeyUsage,

    /// The Internet number resources of the certificate.
    resources: Resources,
}

/// # Creation and Conversion
///
impl TbsCert {
    /// Creates a new value from the necessary data.
    ///
    /// The resources start out as an empty explicit set. Use
    /// [`set_resources`][Self::set_resources] to change them.
    pub fn new(
        serial_number: Serial,
        issuer: Name,
        validity: Validity,
        subject: Option<Name>,
        subject_public_key_info: PublicKey,
        key_usage: KeyUsage,
    ) -> Self {
        Self {
            serial_number,
            signature: RpkiSignatureAlgorithm::default(),
            issuer,
            validity,
            subject: {
                subject.unwrap_or_else(||
                    subject_public_key_info.to_subject_name()
                )
            },
            subject_key_identifier: subject_public_key_info.key_identifier(),
            subject_public_key_info,
            basic_ca: None,
            authority_key_identifier: None,
            key_usage,
            resources: Resources::Blocks(ResourceSet::empty()),
        }
    }

    /// Converts the value into a signed certificate.
    pub fn into_cert<S: Signer>(
        self,
        signer: &S,
        key: &S::KeyId,
    ) -> Result<Cert, SigningError<S::Error>> {
        let data = Captured::from_values(Mode::Der, self.encode_ref());
        let signature = signer.sign(key, &data)?;
        Ok(Cert {
            signed_data: SignedData::new(data, signature),
            tbs: self
        })
    }
}

/// # Data Access
///
impl TbsCert {
    /// Returns the serial number of the certificate.
    pub fn serial_number(&self) -> Serial {
        self.serial_number
    }

    /// Returns a reference to the issuer.
    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    /// Returns the validity.
    pub fn validity(&self) -> Validity {
        self.validity
    }

    /// Returns a reference to the subject.
    pub fn subject(&self) -> &Name {
        &self.subject
    }

    /// Returns a reference to the public key.
    pub fn subject_public_key_info(&self) -> &PublicKey {
        &self.subject_public_key_info
    }

    /// Returns the cA field of the basic constraints extension if present.
    pub fn basic_ca(&self) -> Option<bool> {
        self.basic_ca
    }

    /// Sets the basic constraints extension.
    ///
    /// If `value` is `None`, the extension will not be present. Otherwise
    /// it will be present with the cA boolean set to the given value.
    pub fn set_basic_ca(&mut self, value: Option<bool>) {
        self.basic_ca = value
    }

    /// Returns the subject key identifier.
    pub fn subject_key_identifier(&self) -> KeyIdentifier {
        self.subject_key_identifier
    }

    /// Returns the authority key identifier if present.
    pub fn authority_key_identifier(&self) -> Option<KeyIdentifier> {
        self.authority_key_identifier
    }

    /// Sets the authority key identifier extension.
    pub fn set_authority_key_identifier(
        &mut self, id: Option<KeyIdentifier>
    ) {
        self.authority_key_identifier = id
    }

    /// Returns the key usage of the certificate.
    pub fn key_usage(&self) -> KeyUsage {
        self.key_usage
    }

    /// Returns a reference to the resources of the certificate.
    pub fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Sets the resources of the certificate.
    pub fn set_resources(&mut self, resources: Resources) {
        self.resources = resources
    }
}

/// # Decoding and Encoding
///
impl TbsCert {
    /// Parses the content of a Certificate sequence.
    pub fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            // version [0] EXPLICIT Version DEFAULT v1.
            //  -- we need extensions so apparently, we want v3 which,
            //     confusingly, is 2.
            cons.take_constructed_if(Tag::CTX_0, |c| c.skip_u8_if(2))?;

            let serial_number = Serial::take_from(cons)?;
            let signature = RpkiSignatureAlgorithm::x509_take_from(cons)?;
            let issuer = Name::take_from(cons)?;
            let validity = Validity::take_from(cons)?;
            let subject = Name::take_from(cons)?;
            let subject_public_key_info = PublicKey::take_from(cons)?;

            // issuerUniqueID and subjectUniqueID must not be present in
            // resource certificates. So extensions are next.

            let mut basic_ca = None;
            let mut subject_key_id = None;
            let mut authority_key_id = None;
            let mut key_usage = None;
            let mut ip_resources = None;
            let mut as_resources = None;

            cons.take_constructed_if(Tag::CTX_3, |c| c.take_sequence(|cons| {
                while let Some(()) = cons.take_opt_sequence(|cons| {
                    let id = Oid::take_from(cons)?;
                    let critical = cons.take_opt_bool()?.unwrap_or(false);
                    let value = OctetString::take_from(cons)?;
                    Mode::Der.decode(value, |content| {
                        if id == oid::CE_BASIC_CONSTRAINTS {
                            Self::take_basic_constraints(
                                content, &mut basic_ca
                            )
                        } else if id == oid::CE_SUBJECT_KEY_IDENTIFIER {
                            Self::take_subject_key_identifier(
                                content, &mut subject_key_id
                            )
                        } else if id == oid::CE_AUTHORITY_KEY_IDENTIFIER {
                            Self::take_authority_key_identifier(
                                content, &mut authority_key_id
                            )
                        } else if id == oid::CE_KEY_USAGE {
                            Self::take_key_usage(content, &mut key_usage)
                        } else if id == oid::CE_CERTIFICATE_POLICIES {
                            // We don’t need the policies but they are
                            // critical, so skip over them explicitly.
                            content.skip_all()
                        } else if id == oid::PE_IP_ADDR_BLOCK {
                            Self::take_ip_resources(
                                content, &mut ip_resources
                            )
                        } else if id == oid::PE_AUTONOMOUS_SYS_IDS {
                            Self::take_as_resources(
                                content, &mut as_resources
                            )
                        } else if critical {
                            Err(content.content_err(
                                "unexpected critical extension"
                            ))
                        } else {
                            // RFC 5280 says we can ignore non-critical
                            // extensions we don’t know of. RFC 6487
                            // agrees. So let’s do that.
                            Ok(())
                        }
                    }).map_err(DecodeError::convert)?;
                    Ok(())
                })? { }
                Ok(())
            }))?;

            let (v4, v6) = ip_resources.unwrap_or((None, None));
            let resources = Self::combine_resources(
                v4, v6, as_resources
            ).map_err(|err| cons.content_err(err))?;

            Ok(Self {
                serial_number,
                signature,
                issuer,
                validity,
                subject,
                subject_public_key_info,
                basic_ca,
                subject_key_identifier: subject_key_id.ok_or_else(|| {
                    cons.content_err(
                        "missing Subject Key Identifier extension"
                    )
                })?,
                authority_key_identifier: authority_key_id,
                key_usage: key_usage.ok_or_else(|| {
                    cons.content_err("missing Key Usage extension")
                })?,
                resources,
            })
        })
    }

    /// Combines the decoded per-family resources into a single value.
    ///
    /// Mixing inherited and explicit resources on one certificate is
    /// rejected.
    fn combine_resources(
        v4: Option<IpResources>,
        v6: Option<IpResources>,
        asn: Option<AsResources>,
    ) -> Result<Resources, &'static str> {
        if v4.is_none() && v6.is_none() && asn.is_none() {
            return Err("both AS and IP resources extensions are missing")
        }
        let inherited = [
            v4.as_ref().map(ResourcesChoice::is_inherited),
            v6.as_ref().map(ResourcesChoice::is_inherited),
            asn.as_ref().map(ResourcesChoice::is_inherited),
        ];
        let mut present = inherited.iter().flatten();
        if present.clone().all(|&inherit| inherit) {
            return Ok(Resources::Inherit)
        }
        if present.any(|&inherit| inherit) {
            return Err("mixed inherited and explicit resources")
        }
        let mut set = ResourceSet::empty();
        if let Some(ResourcesChoice::Blocks(blocks)) = v4 {
            set = ResourceSet::new(
                blocks, set.v6().clone(), set.asn().clone()
            );
        }
        if let Some(ResourcesChoice::Blocks(blocks)) = v6 {
            set = ResourceSet::new(
                set.v4().clone(), blocks, set.asn().clone()
            );
        }
        if let Some(ResourcesChoice::Blocks(blocks)) = asn {
            set = ResourceSet::new(
                set.v4().clone(), set.v6().clone(), blocks
            );
        }
        Ok(Resources::Blocks(set))
    }

    /// Parses the Basic Constraints extension.
    ///
    /// ```text
    /// BasicConstraints        ::= SEQUENCE {
    ///     cA                      BOOLEAN DEFAULT FALSE,
    ///     pathLenConstraint       INTEGER (0..MAX) OPTIONAL
    /// }
    /// ```
    ///
    /// The pathLenConstraint field must not be present.
    fn take_basic_constraints<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        basic_ca: &mut Option<bool>,
    ) -> Result<(), DecodeError<S::Error>> {
        if basic_ca.is_some() {
            Err(cons.content_err("duplicate Basic Constraints extension"))
        }
        else {
            cons.take_sequence(|cons| {
                *basic_ca = Some(cons.take_opt_bool()?.unwrap_or(false));
                if cons.take_opt_u64()?.is_some() {
                    Err(cons.content_err(
                        "pathLenConstraint in Basic Constraints extension"
                    ))
                } else {
                    Ok(())
                }
            })
        }
    }

    /// Parses the Subject Key Identifier extension.
    ///
    /// The extension must be present and contain the 160 bit SHA-1 hash of
    /// the value of the DER-encoded bit string of the subject public key.
    fn take_subject_key_identifier<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        subject_key_id: &mut Option<KeyIdentifier>,
    ) -> Result<(), DecodeError<S::Error>> {
        if subject_key_id.is_some() {
            Err(cons.content_err(
                "duplicate Subject Key Identifier extension"
            ))
        }
        else {
            *subject_key_id = Some(KeyIdentifier::take_from(cons)?);
            Ok(())
        }
    }

    /// Parses the Authority Key Identifier extension.
    ///
    /// ```text
    /// AuthorityKeyIdentifier ::= SEQUENCE {
    ///   keyIdentifier             [0] KeyIdentifier           OPTIONAL,
    ///   authorityCertIssuer       [1] GeneralNames            OPTIONAL,
    ///   authorityCertSerialNumber [2] CertificateSerialNumber OPTIONAL  }
    /// ```
    ///
    /// Must be present except in self-signed CA certificates where it is
    /// optional. The keyIdentifier field must be present, the others must
    /// not be.
    fn take_authority_key_identifier<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        authority_key_id: &mut Option<KeyIdentifier>,
    ) -> Result<(), DecodeError<S::Error>> {
        if authority_key_id.is_some() {
            Err(cons.content_err(
                "duplicate Authority Key Identifier extension"
            ))
        }
        else {
            *authority_key_id = Some(
                cons.take_sequence(|cons| {
                    cons.take_value_if(
                        Tag::CTX_0, KeyIdentifier::from_content
                    )
                })?
            );
            Ok(())
        }
    }

    /// Parses the Key Usage extension.
    ///
    /// In CA certificates, keyCertSign and cRLSign must be set, in EE
    /// certificates, digitalSignature must be set.
    fn take_key_usage<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        key_usage: &mut Option<KeyUsage>
    ) -> Result<(), DecodeError<S::Error>> {
        if key_usage.is_some() {
            Err(cons.content_err("duplicate Key Usage extension"))
        }
        else {
            *key_usage = Some({
                let bits = BitString::take_from(cons)?;
                if bits.bit(5) && bits.bit(6) {
                    Ok(KeyUsage::Ca)
                }
                else if bits.bit(0) {
                    Ok(KeyUsage::Ee)
                }
                else {
                    Err(cons.content_err("invalid Key Usage"))
                }
            }?);
            Ok(())
        }
    }

    /// Parses the IP Resources extension.
    ///
    /// ```text
    /// IPAddrBlocks ::= SEQUENCE OF IPAddressFamily
    /// ```
    fn take_ip_resources<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        ip_resources: &mut Option<(Option<IpResources>, Option<IpResources>)>
    ) -> Result<(), DecodeError<S::Error>> {
        if ip_resources.is_some() {
            return Err(cons.content_err("duplicate IP Resources extension"))
        }
        *ip_resources = Some(cons.take_sequence(|cons| {
            let mut v4 = None;
            let mut v6 = None;
            while let Some(()) = cons.take_opt_sequence(|cons| {
                match AddressFamily::take_from(cons)? {
                    AddressFamily::Ipv4 => {
                        if v4.is_some() {
                            return Err(cons.content_err(
                                "duplicate IPv4 address family"
                            ))
                        }
                        v4 = Some(IpResources::take_from(
                            cons, AddressFamily::Ipv4
                        )?);
                    }
                    AddressFamily::Ipv6 => {
                        if v6.is_some() {
                            return Err(cons.content_err(
                                "duplicate IPv6 address family"
                            ))
                        }
                        v6 = Some(IpResources::take_from(
                            cons, AddressFamily::Ipv6
                        )?);
                    }
                }
                Ok(())
            })? { }
            if v4.is_none() && v6.is_none() {
                return Err(cons.content_err("empty IP Resources extension"))
            }
            Ok((v4, v6))
        })?);
        Ok(())
    }

    /// Parses the AS Resources extension.
    ///
    /// ```text
    /// ASIdentifiers ::= SEQUENCE {
    ///     asnum     [0] EXPLICIT ASIdentifierChoice OPTIONAL,
    ///     rdi       [1] EXPLICIT ASIdentifierChoice OPTIONAL }
    /// ```
    ///
    /// The rdi field must not be present.
    fn take_as_resources<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        as_resources: &mut Option<AsResources>
    ) -> Result<(), DecodeError<S::Error>> {
        if as_resources.is_some() {
            return Err(cons.content_err("duplicate AS Resources extension"))
        }
        *as_resources = Some(cons.take_sequence(|cons| {
            cons.take_constructed_if(Tag::CTX_0, AsResources::take_from)
        })?);
        Ok(())
    }

    /// Returns an encoder for the value.
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        encode::sequence((
            encode::sequence_as(Tag::CTX_0, 2.encode()), // version
            self.serial_number.encode(),
            self.signature.x509_encode(),
            self.issuer.encode_ref(),
            self.validity.encode(),
            self.subject.encode_ref(),
            self.subject_public_key_info.encode_ref(),
            // no issuerUniqueID, no subjectUniqueID
            encode::sequence_as(Tag::CTX_3, encode::sequence((
                // Basic Constraints
                self.basic_ca.map(|ca| {
                    encode_extension(
                        &oid::CE_BASIC_CONSTRAINTS, true,
                        encode::sequence(
                            if ca { Some(ca.encode()) }
                            else { None }
                        )
                    )
                }),

                // Subject Key Identifier
                encode_extension(
                    &oid::CE_SUBJECT_KEY_IDENTIFIER, false,
                    self.subject_key_identifier.encode_ref(),
                ),

                // Authority Key Identifier
                self.authority_key_identifier.as_ref().map(|id| {
                    encode_extension(
                        &oid::CE_AUTHORITY_KEY_IDENTIFIER, false,
                        encode::sequence(id.encode_ref_as(Tag::CTX_0))
                    )
                }),

                // Key Usage
                encode_extension(
                    &oid::CE_KEY_USAGE, true,
                    self.key_usage.encode()
                ),

                // IP Resources
                self.encode_ip_resources(),

                // AS Resources
                self.encode_as_resources(),
            )))
        ))
    }

    /// Returns an encoder for the IP Resources extension if needed.
    fn encode_ip_resources(&self) -> Option<impl encode::Values + '_> {
        let (v4, v6) = match self.resources {
            Resources::Inherit => (
                IpResources::Inherit, IpResources::Inherit
            ),
            Resources::Blocks(ref set) => {
                if set.v4().is_empty() && set.v6().is_empty() {
                    return None
                }
                (
                    ResourcesChoice::Blocks(set.v4().clone()),
                    ResourcesChoice::Blocks(set.v6().clone()),
                )
            }
        };
        Some(encode_extension(
            &oid::PE_IP_ADDR_BLOCK, true,
            encode::sequence(Captured::from_values(Mode::Der, (
                v4.encode_family(AddressFamily::Ipv4),
                v6.encode_family(AddressFamily::Ipv6),
            )))
        ))
    }

    /// Returns an encoder for the AS Resources extension if needed.
    fn encode_as_resources(&self) -> Option<impl encode::Values + '_> {
        let asn = match self.resources {
            Resources::Inherit => AsResources::Inherit,
            Resources::Blocks(ref set) => {
                if set.asn().is_empty() {
                    return None
                }
                ResourcesChoice::Blocks(set.asn().clone())
            }
        };
        Some(encode_extension(
            &oid::PE_AUTONOMOUS_SYS_IDS, true,
            encode::sequence(
                encode::sequence_as(
                    Tag::CTX_0,
                    Captured::from_values(Mode::Der, asn.encode_choice())
                )
            )
        ))
    }
}


//------------ KeyUsage ------------------------------------------------------

/// The allowed key usages of a resource certificate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyUsage {
    /// A CA certificate.
    Ca,

    /// An end-entity certificate.
    Ee,
}

impl KeyUsage {
    /// Returns a value encoder for the key usage.
    pub fn encode(self) -> impl encode::Values {
        let s = match self {
            KeyUsage::Ca => b"\x01\x06", // Bits 5 and 6
            KeyUsage::Ee => b"\x07\x80", // Bit 0
        };
        s.encode_as(Tag::BIT_STRING)
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::softsigner::OpenSslSigner;
    use crate::x509::Time;

    fn make_cert(
        signer: &OpenSslSigner, resources: Resources
    ) -> (Cert, PublicKey) {
        let key = signer.create_key().unwrap();
        let pub_key = signer.get_key_info(&key).unwrap();
        let mut tbs = TbsCert::new(
            12u64.into(),
            pub_key.to_subject_name(),
            Validity::new(Time::five_minutes_ago(), Time::next_week()),
            None,
            pub_key.clone(),
            KeyUsage::Ca,
        );
        tbs.set_basic_ca(Some(true));
        tbs.set_resources(resources);
        (tbs.into_cert(signer, &key).unwrap(), pub_key)
    }

    #[test]
    fn encode_decode_explicit_resources() {
        let signer = OpenSslSigner::new();
        let set = ResourceSet::from_strs(
            "10.0.0.0/8", "2001:db8::/32", "AS64496-AS64511"
        ).unwrap();
        let (cert, pub_key) = make_cert(
            &signer, Resources::Blocks(set.clone())
        );
        let encoded = cert.to_captured();
        let decoded = Cert::decode(encoded.as_slice()).unwrap();
        assert_eq!(decoded.serial_number(), Serial::from(12u64));
        assert_eq!(decoded.resources(), &Resources::Blocks(set));
        assert_eq!(decoded.basic_ca(), Some(true));
        assert_eq!(decoded.key_usage(), KeyUsage::Ca);
        assert!(decoded.is_self_issued());
        assert!(decoded.verify_signature(&pub_key).is_ok());
    }

    #[test]
    fn encode_decode_inherited_resources() {
        let signer = OpenSslSigner::new();
        let (cert, _) = make_cert(&signer, Resources::Inherit);
        let decoded = Cert::decode(cert.to_captured().as_slice()).unwrap();
        assert_eq!(decoded.resources(), &Resources::Inherit);
    }

    #[test]
    fn reject_tampered_signature() {
        let signer = OpenSslSigner::new();
        let set = ResourceSet::from_strs("10.0.0.0/8", "", "").unwrap();
        let (cert, _) = make_cert(&signer, Resources::Blocks(set));
        let other = signer.create_key().unwrap();
        let other_key = signer.get_key_info(&other).unwrap();
        assert!(cert.verify_signature(&other_key).is_err());
    }
}
