//! Certificate revocation lists.
//!
//! RPKI reuses the X.509 certificate revocation lists (CRLs) defined in
//! [RFC 5280], limiting the allowed fields as laid out in [RFC 6487]. This
//! module provides the type [`Crl`] for parsed CRLs and [`TbsCertList`]
//! which can be used to construct and sign new CRLs.
//!
//! [RFC 5280]: https://tools.ietf.org/html/rfc5280
//! [RFC 6487]: https://tools.ietf.org/html/rfc6487

use bcder::{decode, encode};
use bcder::{Captured, Mode, OctetString, Oid, Tag};
use bcder::decode::{DecodeError, IntoSource, Source};
use bcder::encode::PrimitiveContent;
use crate::crypto::{
    KeyIdentifier, PublicKey, RpkiSignatureAlgorithm,
    SignatureVerificationError, Signer, SigningError,
};
use crate::oid;
use crate::x509::{encode_extension, Name, Serial, SignedData, Time};


//------------ Crl -----------------------------------------------------------

/// An RPKI certificate revocation list.
#[derive(Clone, Debug)]
pub struct Crl {
    /// The outer structure of the CRL.
    signed_data: SignedData,

    /// The payload of the CRL.
    tbs: TbsCertList,
}

/// # Decoding and Encoding
///
impl Crl {
    /// Decodes a source as a certificate revocation list.
    pub fn decode<S: IntoSource>(
        source: S,
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    /// Takes an encoded CRL from the beginning of a constructed value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(Self::from_constructed)
    }

    /// Parses the content of a CertificateList sequence.
    pub fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let signed_data = SignedData::from_constructed(cons)?;
        let tbs = signed_data.data().clone().decode(
            TbsCertList::from_constructed
        ).map_err(DecodeError::convert)?;
        Ok(Self { signed_data, tbs })
    }

    /// Returns a value encoder for a reference to the CRL.
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        self.signed_data.encode_ref()
    }

    /// Returns a captured encoding of the CRL.
    pub fn to_captured(&self) -> Captured {
        Captured::from_values(Mode::Der, self.encode_ref())
    }
}

/// # Data Access
///
impl Crl {
    /// Verifies the signature of the CRL with the given key.
    pub fn verify_signature(
        &self, public_key: &PublicKey
    ) -> Result<(), SignatureVerificationError> {
        self.signed_data.verify_signature(public_key)
    }
}


//--- Deref-like access

impl std::ops::Deref for Crl {
    type Target = TbsCertList;

    fn deref(&self) -> &Self::Target {
        &self.tbs
    }
}

impl AsRef<TbsCertList> for Crl {
    fn as_ref(&self) -> &TbsCertList {
        &self.tbs
    }
}


//--- PartialEq and Eq

impl PartialEq for Crl {
    fn eq(&self, other: &Self) -> bool {
        self.signed_data == other.signed_data
    }
}

impl Eq for Crl {}


//------------ TbsCertList ---------------------------------------------------

/// The payload of a certificate revocation list.
#[derive(Clone, Debug)]
pub struct TbsCertList {
    /// The algorithm used for signing the list.
    signature: RpkiSignatureAlgorithm,

    /// The name of the issuer.
    issuer: Name,

    /// The time this version of the list was created.
    this_update: Time,

    /// The time the next version of the list is expected.
    ///
    /// RFC 5280 has this as optional but RFC 6487 requires it, so we do,
    /// too.
    next_update: Time,

    /// The list of revoked certificates.
    revoked_certs: RevokedCertificates,

    /// Authority Key Identifier extension.
    authority_key_id: Option<KeyIdentifier>,

    /// CRL Number extension.
    crl_number: Serial,
}

/// # Creation and Conversion
///
impl TbsCertList {
    /// Creates a new list from the necessary data.
    pub fn new(
        issuer: Name,
        this_update: Time,
        next_update: Time,
        revoked_certs: RevokedCertificates,
        authority_key_id: Option<KeyIdentifier>,
        crl_number: Serial,
    ) -> Self {
        Self {
            signature: RpkiSignatureAlgorithm::default(),
            issuer,
            this_update,
            next_update,
            revoked_certs,
            authority_key_id,
            crl_number,
        }
    }

    /// Converts the value into a signed CRL.
    pub fn into_crl<S: Signer>(
        self,
        signer: &S,
        key: &S::KeyId,
    ) -> Result<Crl, SigningError<S::Error>> {
        let data = Captured::from_values(Mode::Der, self.encode_ref());
        let signature = signer.sign(key, &data)?;
        Ok(Crl {
            signed_data: SignedData::new(data, signature),
            tbs: self
        })
    }
}

/// # Data Access
///
impl TbsCertList {
    /// Returns a reference to the issuer.
    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    /// Returns the time this version of the list was created.
    pub fn this_update(&self) -> Time {
        self.this_update
    }

    /// Returns the time the next version of the list is expected.
    pub fn next_update(&self) -> Time {
        self.next_update
    }

    /// Returns whether the given serial number is on the list.
    pub fn contains(&self, serial: Serial) -> bool {
        self.revoked_certs.contains(serial)
    }

    /// Returns a reference to the list of revoked certificates.
    pub fn revoked_certs(&self) -> &RevokedCertificates {
        &self.revoked_certs
    }

    /// Returns the authority key identifier if present.
    pub fn authority_key_identifier(&self) -> Option<KeyIdentifier> {
        self.authority_key_id
    }

    /// Returns the CRL number of this version of the list.
    pub fn crl_number(&self) -> Serial {
        self.crl_number
    }
}

/// # Decoding and Encoding
///
impl TbsCertList {
    /// Parses the content of a TBSCertList sequence.
    pub fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            cons.skip_u8_if(1)?; // v2 => 1
            let signature = RpkiSignatureAlgorithm::x509_take_from(cons)?;
            let issuer = Name::take_from(cons)?;
            let this_update = Time::take_from(cons)?;
            let next_update = Time::take_from(cons)?;
            let revoked_certs = RevokedCertificates::take_from(cons)?;
            let mut authority_key_id = None;
            let mut crl_number = None;
            cons.take_constructed_if(Tag::CTX_0, |cons| {
                cons.take_sequence(|cons| {
                    while let Some(()) = cons.take_opt_sequence(|cons| {
                        let id = Oid::take_from(cons)?;
                        let _critical = cons.take_opt_bool()?;
                        let value = OctetString::take_from(cons)?;
                        Mode::Der.decode(value, |content| {
                            if id == oid::CE_AUTHORITY_KEY_IDENTIFIER {
                                Self::take_authority_key_identifier(
                                    content, &mut authority_key_id
                                )
                            }
                            else if id == oid::CE_CRL_NUMBER {
                                Self::take_crl_number(
                                    content, &mut crl_number
                                )
                            }
                            else {
                                // RFC 6487 allows no other extensions.
                                Err(content.content_err(
                                    "unexpected CRL extension"
                                ))
                            }
                        }).map_err(DecodeError::convert)?;
                        Ok(())
                    })? { }
                    Ok(())
                })
            })?;
            Ok(Self {
                signature,
                issuer,
                this_update,
                next_update,
                revoked_certs,
                authority_key_id,
                crl_number: crl_number.ok_or_else(|| {
                    cons.content_err("missing CRL Number extension")
                })?,
            })
        })
    }

    /// Parses the Authority Key Identifier extension.
    fn take_authority_key_identifier<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        authority_key_id: &mut Option<KeyIdentifier>,
    ) -> Result<(), DecodeError<S::Error>> {
        if authority_key_id.is_some() {
            return Err(cons.content_err(
                "duplicate Authority Key Identifier extension"
            ))
        }
        *authority_key_id = Some(
            cons.take_sequence(|cons| {
                cons.take_value_if(Tag::CTX_0, KeyIdentifier::from_content)
            })?
        );
        Ok(())
    }

    /// Parses the CRL Number extension.
    fn take_crl_number<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        crl_number: &mut Option<Serial>,
    ) -> Result<(), DecodeError<S::Error>> {
        if crl_number.is_some() {
            return Err(cons.content_err(
                "duplicate CRL Number extension"
            ))
        }
        *crl_number = Some(Serial::take_from(cons)?);
        Ok(())
    }

    /// Returns a value encoder for a reference to the value.
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        encode::sequence((
            1.encode(), // version
            self.signature.x509_encode(),
            self.issuer.encode_ref(),
            self.this_update.encode_varied(),
            self.next_update.encode_varied(),
            self.revoked_certs.encode_ref(),
            encode::sequence_as(Tag::CTX_0, encode::sequence((
                self.authority_key_id.as_ref().map(|id| {
                    encode_extension(
                        &oid::CE_AUTHORITY_KEY_IDENTIFIER, false,
                        encode::sequence(id.encode_ref_as(Tag::CTX_0))
                    )
                }),
                encode_extension(
                    &oid::CE_CRL_NUMBER, false,
                    self.crl_number.encode()
                ),
            )))
        ))
    }
}


//------------ RevokedCertificates ------------------------------------------

/// The list of revoked certificates of a CRL.
///
/// A value of this type wraps the DER encoding of the list. Whether a
/// certain serial number is part of the list can be checked with the
/// [`contains`][Self::contains] method which decodes the list on the fly.
#[derive(Clone, Debug)]
pub struct RevokedCertificates(Captured);

impl RevokedCertificates {
    /// Creates an empty list.
    pub fn empty() -> Self {
        RevokedCertificates(Captured::empty(Mode::Der))
    }

    /// Takes the revoked certificates list from a constructed value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let res = cons.take_opt_sequence(|cons| {
            cons.capture(|cons| {
                while CrlEntry::take_opt_from(cons)?.is_some() { }
                Ok(())
            })
        })?;
        Ok(RevokedCertificates(match res {
            Some(res) => res,
            None => Captured::empty(Mode::Der)
        }))
    }

    /// Returns whether the given serial number is contained in the list.
    pub fn contains(&self, serial: Serial) -> bool {
        self.iter().any(|entry| entry.user_certificate == serial)
    }

    /// Creates a list from an iterator over entries.
    ///
    /// This can't be the `FromIterator` trait because of the `Clone`
    /// requirement on `I::IntoIter`.
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = CrlEntry>,
        I::IntoIter: Clone,
    {
        RevokedCertificates(Captured::from_values(
            Mode::Der,
            encode::iter(iter.into_iter().map(CrlEntry::encode))
        ))
    }

    /// Returns an iterator over the entries of the list.
    pub fn iter(&self) -> RevokedCertificatesIter {
        RevokedCertificatesIter(self.0.clone())
    }

    /// Returns a value encoder for a reference to the value.
    ///
    /// An empty list is left out of the CRL entirely.
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        if self.0.is_empty() {
            None
        }
        else {
            Some(encode::sequence(&self.0))
        }
    }
}


//------------ RevokedCertificatesIter ---------------------------------------

/// An iterator over the entries of a revoked certificates list.
#[derive(Clone, Debug)]
pub struct RevokedCertificatesIter(Captured);

impl Iterator for RevokedCertificatesIter {
    type Item = CrlEntry;

    fn next(&mut self) -> Option<Self::Item> {
        // The list was captured by CrlEntry::take_opt_from, so this cannot
        // fail.
        self.0.decode_partial(|cons| CrlEntry::take_opt_from(cons)).unwrap()
    }
}


//------------ CrlEntry ------------------------------------------------------

/// An entry in the list of revoked certificates.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CrlEntry {
    /// The serial number of the revoked certificate.
    pub user_certificate: Serial,

    /// The time of revocation.
    pub revocation_date: Time,
}

impl CrlEntry {
    /// Creates a new entry.
    pub fn new(user_certificate: Serial, revocation_date: Time) -> Self {
        Self { user_certificate, revocation_date }
    }

    /// Takes an optional CRL entry from a constructed value.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(Self::from_constructed)
    }

    /// Parses the content of a CRL entry.
    pub fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        Ok(CrlEntry {
            user_certificate: Serial::take_from(cons)?,
            revocation_date: Time::take_from(cons)?,
            // crlEntryExtensions are forbidden by RFC 6487.
        })
    }

    /// Returns a value encoder for the entry.
    pub fn encode(self) -> impl encode::Values {
        encode::sequence((
            self.user_certificate.encode(),
            self.revocation_date.encode_varied(),
        ))
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::softsigner::OpenSslSigner;

    fn make_crl(
        signer: &OpenSslSigner, revoked: Vec<CrlEntry>
    ) -> (Crl, PublicKey) {
        let key = signer.create_key().unwrap();
        let pub_key = signer.get_key_info(&key).unwrap();
        let tbs = TbsCertList::new(
            pub_key.to_subject_name(),
            Time::now(),
            Time::tomorrow(),
            RevokedCertificates::from_iter(revoked),
            Some(pub_key.key_identifier()),
            Serial::from(7u64),
        );
        (tbs.into_crl(signer, &key).unwrap(), pub_key)
    }

    #[test]
    fn encode_decode_empty() {
        let signer = OpenSslSigner::new();
        let (crl, pub_key) = make_crl(&signer, Vec::new());
        let decoded = Crl::decode(crl.to_captured().as_slice()).unwrap();
        assert_eq!(decoded.crl_number(), Serial::from(7u64));
        assert!(!decoded.contains(Serial::from(12u64)));
        assert!(decoded.verify_signature(&pub_key).is_ok());
    }

    #[test]
    fn encode_decode_revoked() {
        let signer = OpenSslSigner::new();
        let (crl, _) = make_crl(&signer, vec![
            CrlEntry::new(Serial::from(12u64), Time::five_minutes_ago()),
            CrlEntry::new(Serial::from(42u64), Time::now()),
        ]);
        let decoded = Crl::decode(crl.to_captured().as_slice()).unwrap();
        assert!(decoded.contains(Serial::from(12u64)));
        assert!(decoded.contains(Serial::from(42u64)));
        assert!(!decoded.contains(Serial::from(13u64)));
        assert_eq!(decoded.revoked_certs().iter().count(), 2);
    }
}
