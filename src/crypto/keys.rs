//! Types and parameters of keys.

use std::{error, fmt, io, str};
use std::str::FromStr;
use bcder::{decode, encode};
use bcder::{BitString, Mode, Tag};
use bcder::decode::{ContentError, DecodeError, IntoSource, Source};
use bcder::encode::{PrimitiveContent, Values};
use bytes::Bytes;
use ring::signature;
use ring::signature::VerificationAlgorithm;
use ring::error::Unspecified;
use untrusted::Input;
use crate::oid;
use crate::util::hex;
use crate::x509::{Name, RepresentationError};
use super::digest;
use super::signature::RpkiSignature;


//------------ PublicKeyFormat -----------------------------------------------

/// The formats of public keys used by RPKI.
///
/// Currently, RPKI uses exactly one type of public keys, RSA keys with a
/// size of 2048 bits. However, as that might change in the future, we are
/// not hard-coding that format but rather use this type – which for the time
/// being is zero-sized.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PublicKeyFormat(());

/// # ASN.1 Algorithm Identifiers
///
/// The format of the public key is identified in certificates through an
/// algorithm identifier defined with this ASN.1:
///
/// ```txt
/// AlgorithmIdentifier ::= SEQUENCE {
///      algorithm          OBJECT IDENTIFIER,
///      parameters         ANY DEFINED BY algorithm OPTIONAL }
/// ```
///
/// Right now, the object identifier needs to be that of `rsaEncryption`
/// defined by [RFC 4055] and the parameters must be present and NULL.
/// When parsing, we generously also allow it to be absent altogether.
///
/// [RFC 4055]: https://tools.ietf.org/html/rfc4055
impl PublicKeyFormat {
    /// Takes and returns an algorithm identifier.
    ///
    /// Returns a malformed error if the algorithm isn’t one of the allowed
    /// algorithms or if the value isn’t correctly encoded.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(Self::from_constructed)
    }

    /// Parses the algorithm identifier from the contents of its sequence.
    fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        oid::RSA_ENCRYPTION.skip_if(cons)?;
        cons.take_opt_null()?;
        Ok(PublicKeyFormat::default())
    }

    /// Provides an encoder for the algorithm identifier.
    pub fn encode(self) -> impl encode::Values {
        encode::sequence((
            oid::RSA_ENCRYPTION.encode(),
            ().encode(),
        ))
    }
}


//------------ PublicKey -----------------------------------------------------

/// A public key.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublicKey {
    algorithm: PublicKeyFormat,
    bits: BitString,
}

impl PublicKey {
    pub fn algorithm(&self) -> &PublicKeyFormat {
        &self.algorithm
    }

    pub fn bits(&self) -> &[u8] {
        // The bits are a valid DER-encoded RSAPublicKey, so they are a
        // complete number of octets without unused bits.
        self.bits.octet_slice().unwrap_or(b"")
    }

    /// Returns the SHA-1 hash over the key’s bits.
    pub fn key_identifier(&self) -> KeyIdentifier {
        let mut res = [0u8; 20];
        res.copy_from_slice(
            digest::sha1_digest(self.bits()).as_ref()
        );
        KeyIdentifier(res)
    }

    /// Verifies a signature using this public key.
    pub fn verify(
        &self, message: &[u8], signature: &RpkiSignature
    ) -> Result<(), SignatureVerificationError> {
        signature::RSA_PKCS1_2048_8192_SHA256.verify(
            Input::from(self.bits()),
            Input::from(message),
            Input::from(signature.value().as_ref())
        ).map_err(Into::into)
    }
}


/// # As `SubjectPublicKeyInfo`
///
/// Public keys are included in X.509 certificates as `SubjectPublicKeyInfo`
/// structures. As these contain the same information as `PublicKey`, it can
/// be decoded from and encoded to such sequences.
impl PublicKey {
    pub fn decode<S: IntoSource>(
        source: S
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            Ok(PublicKey {
                algorithm: PublicKeyFormat::take_from(cons)?,
                bits: BitString::take_from(cons)?
            })
        })
    }

    pub fn encode(self) -> impl encode::Values {
        encode::sequence((
            self.algorithm.encode(),
            self.bits.encode()
        ))
    }

    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        encode::sequence((
            self.algorithm.encode(),
            self.bits.encode_ref()
        ))
    }

    /// Returns a subject name derived from the key.
    pub fn to_subject_name(&self) -> Name {
        Name::from_pub_key(self)
    }

    /// Returns bytes with the encoded *subjectPublicKeyInfo*.
    pub fn to_info_bytes(&self) -> Bytes {
        self.encode_ref().to_captured(Mode::Der).into_bytes()
    }
}


//------------ KeyIdentifier -------------------------------------------------

/// A key identifier.
///
/// This is the SHA-1 hash over the public key’s bits.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialOrd)]
pub struct KeyIdentifier([u8; 20]);

impl KeyIdentifier {
    /// Creates a new identifier for the given key.
    pub fn from_public_key(key: &PublicKey) -> Self {
        key.key_identifier()
    }

    /// Returns an octet slice of the key identifer’s value.
    pub fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Returns an octet array with the hex representation of the identifier.
    pub fn into_hex(self) -> [u8; 40] {
        let mut res = [0u8; 40];
        hex::encode(self.as_slice(), &mut res);
        res
    }

    /// Takes an encoded key identifier from a constructed value.
    ///
    /// ```text
    /// KeyIdentifier ::= OCTET STRING
    /// ```
    ///
    /// The content of the octet string needs to be a SHA-1 hash, so it must
    /// be exactly 20 octets long.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_value_if(Tag::OCTET_STRING, Self::from_content)
    }

    /// Takes an optional encoded key identifier from a constructed value.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_value_if(Tag::OCTET_STRING, Self::from_content)
    }

    /// Parses an encoded key identifer from encoded content.
    pub fn from_content<S: decode::Source>(
        content: &mut decode::Content<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let prim = content.as_primitive()?;
        if prim.remaining() != 20 {
            return Err(prim.content_err(
                "key identifier is not exactly 20 octets"
            ))
        }
        let bytes = prim.take_all()?;
        let mut res = KeyIdentifier(Default::default());
        res.0.copy_from_slice(bytes.as_ref());
        Ok(res)
    }

    /// Provides an encoder for the identifier.
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        self.encode()
    }

    /// Provides an encoder for the identifier under the given tag.
    pub fn encode_ref_as(&self, tag: Tag) -> impl encode::Values + '_ {
        self.encode_as(tag)
    }
}


//--- TryFrom and FromStr

impl<'a> TryFrom<&'a [u8]> for KeyIdentifier {
    type Error = RepresentationError;

    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        value.try_into().map(KeyIdentifier).map_err(|_| RepresentationError)
    }
}

impl FromStr for KeyIdentifier {
    type Err = RepresentationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.len() != 40 || !value.is_ascii() {
            return Err(RepresentationError)
        }
        let mut res = KeyIdentifier(Default::default());
        let mut pos = 0;
        for ch in value.as_bytes().chunks(2) {
            let ch = str::from_utf8(ch).map_err(|_| RepresentationError)?;
            res.0[pos] = u8::from_str_radix(ch, 16)
                            .map_err(|_| RepresentationError)?;
            pos += 1;
        }
        Ok(res)
    }
}


//--- AsRef and PartialEq

impl AsRef<[u8]> for KeyIdentifier {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<T: AsRef<[u8]>> PartialEq<T> for KeyIdentifier {
    fn eq(&self, other: &T) -> bool {
        self.0.as_ref().eq(other.as_ref())
    }
}


//--- Display and Debug

impl fmt::Display for KeyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut buf = [0u8; 40];
        write!(f, "{}", hex::encode(self.as_slice(), &mut buf))
    }
}

impl fmt::Debug for KeyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "KeyIdentifier({self})")
    }
}


//--- PrimitiveContent

impl PrimitiveContent for KeyIdentifier {
    const TAG: Tag = Tag::OCTET_STRING;

    fn encoded_len(&self, _mode: Mode) -> usize {
        20
    }

    fn write_encoded<W: io::Write>(
        &self,
        _mode: Mode,
        target: &mut W
    ) -> Result<(), io::Error> {
        target.write_all(&self.0)
    }
}


//--- Serialize and Deserialize

#[cfg(feature = "serde")]
impl serde::Serialize for KeyIdentifier {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S
    ) -> Result<S::Ok, S::Error> {
        let mut buf = [0u8; 40];
        hex::encode(self.as_slice(), &mut buf).serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for KeyIdentifier {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D
    ) -> Result<Self, D::Error> {
        struct Visitor;

        impl serde::de::Visitor<'_> for Visitor {
            type Value = KeyIdentifier;

            fn expecting(
                &self, formatter: &mut fmt::Formatter
            ) -> fmt::Result {
                write!(
                    formatter,
                    "a string with a key identifier as hex digits"
                )
            }

            fn visit_str<E: serde::de::Error>(
                self, s: &str
            ) -> Result<Self::Value, E> {
                KeyIdentifier::from_str(s).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_str(Visitor)
    }
}


//------------ SignatureVerificationError ------------------------------------

/// An error happened while verifying a signature.
///
/// No further information is provided. This is on purpose.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SignatureVerificationError(());

impl From<Unspecified> for SignatureVerificationError {
    fn from(_: Unspecified) -> Self {
        SignatureVerificationError(())
    }
}

impl From<SignatureVerificationError> for ContentError {
    fn from(_: SignatureVerificationError) -> Self {
        ContentError::from_static("signature verification failed")
    }
}

impl fmt::Display for SignatureVerificationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("signature verification failed")
    }
}

impl error::Error for SignatureVerificationError { }


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::Signer;
    use crate::crypto::softsigner::OpenSslSigner;

    #[test]
    fn key_identifier_from_str() {
        let id = KeyIdentifier::from_str(
            "3a98f4d8056337b54b8c71e06e1a3254eac5c4e5"
        ).unwrap();
        assert_eq!(
            id.as_slice(),
            b"\x3a\x98\xf4\xd8\x05\x63\x37\xb5\x4b\x8c\x71\xe0\x6e\x1a\
              \x32\x54\xea\xc5\xc4\xe5"
        );
        assert!(KeyIdentifier::from_str("3a98f4d80563").is_err());
        assert!(
            KeyIdentifier::from_str(
                "3a98x4d8056337b54b8c71e06e1a3254eac5c4e5"
            ).is_err()
        );
    }

    #[test]
    fn info_bytes_decode() {
        let signer = OpenSslSigner::new();
        let key = signer.create_key().unwrap();
        let info = signer.get_key_info(&key).unwrap();
        assert_eq!(
            PublicKey::decode(info.to_info_bytes().as_ref()).unwrap(),
            info
        );
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let signer = OpenSslSigner::new();
        let key = signer.create_key().unwrap();
        let info = signer.get_key_info(&key).unwrap();
        let signature = signer.sign(&key, b"some message").unwrap();
        assert!(info.verify(b"some message", &signature).is_ok());
        assert!(info.verify(b"some messagf", &signature).is_err());
    }
}
