//! Internet number resources: IP address blocks and AS numbers.
//!
//! Resource certificates carry the IP address and AS number resources their
//! subject holds in the extensions defined by [RFC 3779]. This module
//! provides the types for these resources, from single addresses all the
//! way up to [`ResourceSet`], the complete set of resources of a
//! certificate, and [`Resources`] which adds the option of inheriting all
//! resources from the issuing certificate.
//!
//! [RFC 3779]: https://tools.ietf.org/html/rfc3779

use std::{fmt, io};
use std::net::{AddrParseError, IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use bcder::{decode, encode};
use bcder::{BitString, Mode, OctetString, Tag};
use bcder::decode::{ContentError, DecodeError};
use bcder::encode::PrimitiveContent;


//------------ ResourcesChoice -----------------------------------------------

/// The option to either include or inherit resources.
///
/// This is generic over the type of included resources.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ResourcesChoice<T> {
    /// The resources are inherited from the issuer.
    Inherit,

    /// The resources are provided as a set of blocks.
    Blocks(T),
}

impl<T> ResourcesChoice<T> {
    /// Returns whether the resources are of the inherited variant.
    pub fn is_inherited(&self) -> bool {
        matches!(self, ResourcesChoice::Inherit)
    }

    /// Returns a reference to the blocks if there are any.
    pub fn as_blocks(&self) -> Option<&T> {
        match self {
            ResourcesChoice::Inherit => None,
            ResourcesChoice::Blocks(ref inner) => Some(inner),
        }
    }
}


//------------ IpResources ---------------------------------------------------

/// The IP resources of a certificate for one address family.
pub type IpResources = ResourcesChoice<IpBlocks>;

impl IpResources {
    /// Takes a single set of IP resources from a constructed value.
    ///
    /// This parses the `IPAddressChoice` of a single address family.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        family: AddressFamily,
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_value(|tag, content| {
            if tag == Tag::NULL {
                content.to_null()?;
                Ok(ResourcesChoice::Inherit)
            }
            else if tag == Tag::SEQUENCE {
                IpBlocks::parse_content(content, family)
                    .map(ResourcesChoice::Blocks)
            }
            else {
                Err(content.content_err("invalid IP resources"))
            }
        })
    }

    /// Returns an encoder for one `IPAddressFamily` value.
    ///
    /// Returns `None` if the resources are an empty set of blocks which
    /// must be left out of the extension entirely.
    pub fn encode_family(
        &self, family: AddressFamily
    ) -> Option<impl encode::Values + '_> {
        match self {
            ResourcesChoice::Inherit => {
                Some(encode::sequence((
                    family.encode(),
                    encode::Choice2::One(().encode()),
                )))
            }
            ResourcesChoice::Blocks(ref blocks) => {
                if blocks.is_empty() {
                    None
                }
                else {
                    Some(encode::sequence((
                        family.encode(),
                        encode::Choice2::Two(blocks.encode_ref()),
                    )))
                }
            }
        }
    }
}


//------------ AsResources ---------------------------------------------------

/// The AS resources of a certificate.
pub type AsResources = ResourcesChoice<AsBlocks>;

impl AsResources {
    /// Takes the AS resources from the beginning of a constructed value.
    ///
    /// This parses the `ASIdentifierChoice` of the _asnum_ field.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_value(|tag, content| {
            if tag == Tag::NULL {
                content.to_null()?;
                Ok(ResourcesChoice::Inherit)
            }
            else if tag == Tag::SEQUENCE {
                AsBlocks::parse_content(content)
                    .map(ResourcesChoice::Blocks)
            }
            else {
                Err(content.content_err("invalid AS resources"))
            }
        })
    }

    /// Returns an encoder for the `ASIdentifierChoice` value.
    ///
    /// Returns `None` for an empty set of blocks.
    pub fn encode_choice(&self) -> Option<impl encode::Values + '_> {
        match self {
            ResourcesChoice::Inherit => {
                Some(encode::Choice2::One(().encode()))
            }
            ResourcesChoice::Blocks(ref blocks) => {
                if blocks.is_empty() {
                    None
                }
                else {
                    Some(encode::Choice2::Two(blocks.encode_ref()))
                }
            }
        }
    }
}


//------------ IpBlocks ------------------------------------------------------

/// A set of address ranges for one address family.
///
/// The blocks are kept ordered by their smallest address with overlapping
/// and adjacent ranges merged, so two sets cover the same addresses if and
/// only if they are equal.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IpBlocks(Vec<IpBlock>);

impl IpBlocks {
    /// Creates an empty set of address blocks.
    pub fn empty() -> Self {
        IpBlocks(Vec::new())
    }

    /// Creates a set from a comma-separated list of IPv4 blocks.
    pub fn from_v4_str(s: &str) -> Result<Self, FromStrError> {
        s.split(',').map(|el| IpBlock::from_v4_str(el.trim())).collect()
    }

    /// Creates a set from a comma-separated list of IPv6 blocks.
    pub fn from_v6_str(s: &str) -> Result<Self, FromStrError> {
        s.split(',').map(|el| IpBlock::from_v6_str(el.trim())).collect()
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the blocks in the set.
    pub fn iter(&self) -> impl Iterator<Item = &IpBlock> {
        self.0.iter()
    }

    /// Returns whether the set contains the other set in its entirety.
    pub fn contains(&self, other: &Self) -> bool {
        other.0.iter().all(|block| {
            self.0.iter().any(|outer| {
                outer.min() <= block.min() && block.max() <= outer.max()
            })
        })
    }

    /// Sorts and merges the blocks of the set.
    fn normalize(&mut self) {
        self.0.sort_by_key(|block| block.min());
        let mut res: Vec<IpBlock> = Vec::with_capacity(self.0.len());
        for block in self.0.drain(..) {
            if let Some(last) = res.last_mut() {
                let next = last.max().to_bits().checked_add(1);
                if next.map(|next| block.min().to_bits() <= next)
                       .unwrap_or(true) {
                    if block.max() > last.max() {
                        *last = IpBlock::from((last.min(), block.max()));
                    }
                    continue
                }
            }
            res.push(block);
        }
        self.0 = res;
    }
}

impl IpBlocks {
    /// Parses the content of an `IPAddressesOrRanges` value.
    fn parse_content<S: decode::Source>(
        content: &mut decode::Content<S>,
        family: AddressFamily,
    ) -> Result<Self, DecodeError<S::Error>> {
        let cons = content.as_constructed()?;
        let mut res = Vec::new();
        while let Some(block) = IpBlock::take_opt_from(cons, family)? {
            res.push(block)
        }
        if res.is_empty() {
            return Err(cons.content_err("empty IP address blocks"))
        }
        Ok(res.into_iter().collect())
    }

    /// Returns an encoder for an `IPAddressesOrRanges` value.
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        encode::sequence(
            encode::iter(self.0.iter().map(|block| block.encode()))
        )
    }

    /// Returns an object displaying the set as IPv4 blocks.
    pub fn display_v4(&self) -> IpBlocksDisplay {
        IpBlocksDisplay { family: AddressFamily::Ipv4, blocks: self }
    }

    /// Returns an object displaying the set as IPv6 blocks.
    pub fn display_v6(&self) -> IpBlocksDisplay {
        IpBlocksDisplay { family: AddressFamily::Ipv6, blocks: self }
    }
}

impl FromIterator<IpBlock> for IpBlocks {
    fn from_iter<I: IntoIterator<Item = IpBlock>>(iter: I) -> Self {
        let mut res = IpBlocks(iter.into_iter().collect());
        res.normalize();
        res
    }
}


//------------ IpBlocksDisplay -----------------------------------------------

/// Helper type formatting an address block set for one family.
pub struct IpBlocksDisplay<'a> {
    family: AddressFamily,
    blocks: &'a IpBlocks,
}

impl fmt::Display for IpBlocksDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for block in self.blocks.iter() {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            match self.family {
                AddressFamily::Ipv4 => block.fmt_v4(f)?,
                AddressFamily::Ipv6 => block.fmt_v6(f)?,
            }
        }
        Ok(())
    }
}


//------------ IpBlock -------------------------------------------------------

/// A consecutive sequence of IP addresses.
#[derive(Clone, Copy, Debug)]
pub enum IpBlock {
    /// The block is expressed as a prefix.
    Prefix(Prefix),

    /// The block is expressed as a range.
    Range(AddressRange),
}

impl IpBlock {
    /// Creates a new block from an IPv4 representation.
    pub fn from_v4_str(s: &str) -> Result<Self, FromStrError> {
        if let Some(sep) = s.find('/') {
            Prefix::from_v4_str_sep(s, sep).map(IpBlock::Prefix)
        }
        else if let Some(sep) = s.find('-') {
            AddressRange::from_v4_str_sep(s, sep).map(IpBlock::Range)
        }
        else {
            let addr = Addr::from(Ipv4Addr::from_str(s)?);
            Ok(IpBlock::Range(AddressRange::new(addr, addr.to_max(32))))
        }
    }

    /// Creates a new block from an IPv6 representation.
    pub fn from_v6_str(s: &str) -> Result<Self, FromStrError> {
        if let Some(sep) = s.find('/') {
            Prefix::from_v6_str_sep(s, sep).map(IpBlock::Prefix)
        }
        else if let Some(sep) = s.find('-') {
            AddressRange::from_v6_str_sep(s, sep).map(IpBlock::Range)
        }
        else {
            let addr = Addr::from(Ipv6Addr::from_str(s)?);
            Ok(IpBlock::Range(AddressRange::new(addr, addr)))
        }
    }

    /// The smallest address of the block.
    pub fn min(&self) -> Addr {
        match *self {
            IpBlock::Prefix(ref inner) => inner.min(),
            IpBlock::Range(ref inner) => inner.min(),
        }
    }

    /// The largest address of the block.
    pub fn max(&self) -> Addr {
        match *self {
            IpBlock::Prefix(ref inner) => inner.max(),
            IpBlock::Range(ref inner) => inner.max(),
        }
    }

    /// Formats the block as an IPv4 block.
    pub fn fmt_v4(self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IpBlock::Prefix(prefix) => prefix.fmt_v4(f),
            IpBlock::Range(range) => range.fmt_v4(f),
        }
    }

    /// Formats the block as an IPv6 block.
    pub fn fmt_v6(self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IpBlock::Prefix(prefix) => prefix.fmt_v6(f),
            IpBlock::Range(range) => range.fmt_v6(f),
        }
    }
}

impl IpBlock {
    /// Takes an optional address block from the beginning of encoded value.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        family: AddressFamily,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_value(|tag, content| {
            if tag == Tag::BIT_STRING {
                Prefix::parse_content(content, family).map(IpBlock::Prefix)
            }
            else if tag == Tag::SEQUENCE {
                AddressRange::parse_content(
                    content, family
                ).map(IpBlock::Range)
            }
            else {
                Err(content.content_err("invalid IP address block"))
            }
        })
    }

    /// Returns an encoder for an `IPAddressOrRange` value.
    pub fn encode(self) -> impl encode::Values {
        match self {
            IpBlock::Prefix(inner) => {
                encode::Choice2::One(inner.encode())
            }
            IpBlock::Range(inner) => {
                encode::Choice2::Two(inner.encode())
            }
        }
    }
}


//--- From

impl From<Prefix> for IpBlock {
    fn from(prefix: Prefix) -> Self {
        IpBlock::Prefix(prefix)
    }
}

impl From<AddressRange> for IpBlock {
    fn from(range: AddressRange) -> Self {
        IpBlock::Range(range)
    }
}

impl From<(Addr, Addr)> for IpBlock {
    fn from(range: (Addr, Addr)) -> Self {
        match AddressRange::new(range.0, range.1).into_prefix() {
            Ok(prefix) => prefix.into(),
            Err(range) => range.into(),
        }
    }
}


//--- PartialEq and Eq

impl PartialEq for IpBlock {
    fn eq(&self, other: &Self) -> bool {
        self.min() == other.min() && self.max() == other.max()
    }
}

impl Eq for IpBlock {}


//------------ AddressRange --------------------------------------------------

/// An IP address range.
///
/// This type appears in two variants in RFC 3779, either as a single prefix
/// (IPAddress) or as a range (IPAddressRange). Both cases actually cover a
/// consecutive range of addresses, so there is a minimum and a maximum
/// address covered by them. We simply model both of them as ranges of those
/// minimums and maximums.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct AddressRange {
    /// The smallest IP address that is part of this range.
    min: Addr,

    /// The largest IP address that is part of this range.
    ///
    /// Unlike normal Rust ranges, our range is inclusive at the upper end.
    /// This is necessary to represent a range that goes all the way to the
    /// last address.
    max: Addr,
}

impl AddressRange {
    /// Creates a new address range from smallest and largest address.
    pub fn new(min: Addr, max: Addr) -> Self {
        AddressRange { min, max }
    }

    /// Creates a new range from an IPv4 string with known separator.
    fn from_v4_str_sep(s: &str, sep: usize) -> Result<Self, FromStrError> {
        Ok(Self::new(
            Ipv4Addr::from_str(&s[..sep])?.into(),
            Addr::from(Ipv4Addr::from_str(&s[sep + 1..])?).to_max(32)
        ))
    }

    /// Creates a new range from an IPv6 string with known separator.
    fn from_v6_str_sep(s: &str, sep: usize) -> Result<Self, FromStrError> {
        Ok(Self::new(
            Ipv6Addr::from_str(&s[..sep])?.into(),
            Ipv6Addr::from_str(&s[sep + 1..])?.into()
        ))
    }

    /// Returns the smallest IP address that is part of this range.
    pub fn min(&self) -> Addr {
        self.min
    }

    /// Returns the largest IP address that is still part of this range.
    pub fn max(&self) -> Addr {
        self.max
    }

    /// Tries to convert the range into a prefix.
    ///
    /// If this range cannot be expressed as a prefix, returns the range
    /// itself as an error.
    pub fn into_prefix(self) -> Result<Prefix, Self> {
        let len = (self.min.to_bits() ^ self.max.to_bits()).leading_zeros();
        let prefix = Prefix::new(self.min, len as u8);
        if prefix.range() == (self.min, self.max) {
            Ok(prefix)
        }
        else {
            Err(self)
        }
    }

    /// Formats the range as an IPv4 range.
    pub fn fmt_v4(self, f: &mut fmt::Formatter) -> fmt::Result {
        let min = self.min.to_v4();
        let max = self.max.to_v4();
        if min == max {
            fmt::Display::fmt(&min, f)
        }
        else {
            write!(f, "{min}-{max}")
        }
    }

    /// Formats the range as an IPv6 range.
    pub fn fmt_v6(self, f: &mut fmt::Formatter) -> fmt::Result {
        let min = self.min.to_v6();
        let max = self.max.to_v6();
        if min == max {
            fmt::Display::fmt(&min, f)
        }
        else {
            write!(f, "{min}-{max}")
        }
    }
}

impl AddressRange {
    /// Parses the content of an `IPAddressRange` value.
    fn parse_content<S: decode::Source>(
        content: &mut decode::Content<S>,
        family: AddressFamily,
    ) -> Result<Self, DecodeError<S::Error>> {
        let cons = content.as_constructed()?;
        let min = Prefix::take_from(cons, family)?;
        let max = Prefix::take_from(cons, family)?;
        Ok(AddressRange {
            min: min.min(),
            max: max.max(),
        })
    }

    /// Calculates the prefix for the minimum address.
    ///
    /// This is a prefix with all trailing zeros dropped.
    fn min_to_prefix(&self) -> Prefix {
        Prefix::new(self.min, 128 - self.min.to_bits().trailing_zeros() as u8)
    }

    /// Calculates the prefix for the maximum address.
    ///
    /// This is a prefix with all trailing ones dropped.
    fn max_to_prefix(&self) -> Prefix {
        Prefix::new(
            self.max, 128 - (!self.max.to_bits()).trailing_zeros() as u8
        )
    }

    /// Returns an encoder for an `IPAddressRange` value.
    pub fn encode(self) -> impl encode::Values {
        encode::sequence((
            self.min_to_prefix().encode(),
            self.max_to_prefix().encode(),
        ))
    }
}


//------------ Prefix --------------------------------------------------------

/// An IP address prefix.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Prefix {
    /// The address of the prefix.
    ///
    /// The unused bits are zero.
    addr: Addr,

    /// The length of the prefix.
    ///
    /// This will never be more than 128.
    len: u8,
}

impl Prefix {
    /// Creates a new prefix from an address and a length.
    ///
    /// # Panics
    ///
    /// This function panics if `len` is larger than 128.
    pub fn new<A: Into<Addr>>(addr: A, len: u8) -> Self {
        assert!(len <= 128);
        Prefix {
            addr: addr.into().to_min(len),
            len
        }
    }

    /// Creates a new prefix from its encoding as a BIT STRING.
    fn from_bit_string(
        src: &BitString, family: AddressFamily
    ) -> Result<Self, ContentError> {
        if src.octet_len() > 16 {
            return Err(ContentError::from_static(
                "overly long IP address prefix"
            ))
        }
        if src.bit_len() > usize::from(family.max_addr_len()) {
            return Err(ContentError::from_static(
                "IP address prefix too long for family"
            ))
        }
        let mut addr = 0;
        for octet in src.octets() {
            addr = (addr << 8) | (u128::from(octet))
        }
        for _ in src.octet_len()..16 {
            addr <<= 8;
        }
        Ok(Self::new(addr, src.bit_len() as u8))
    }

    /// Creates a prefix from an IPv4 string with a known slash position.
    fn from_v4_str_sep(s: &str, sep: usize) -> Result<Self, FromStrError> {
        let addr = Ipv4Addr::from_str(&s[..sep])?;
        let len = u8::from_str(&s[sep + 1..])?;
        if len > 32 {
            return Err(FromStrError::BadPrefixLen)
        }
        Ok(Prefix::new(addr, len))
    }

    /// Creates a prefix from an IPv6 string with a known slash position.
    fn from_v6_str_sep(s: &str, sep: usize) -> Result<Self, FromStrError> {
        let addr = Ipv6Addr::from_str(&s[..sep])?;
        let len = u8::from_str(&s[sep + 1..])?;
        if len > 128 {
            return Err(FromStrError::BadPrefixLen)
        }
        Ok(Prefix::new(addr, len))
    }

    /// Returns the raw address of the prefix.
    pub fn addr(self) -> Addr {
        self.addr
    }

    /// Returns the length of the prefix.
    pub fn addr_len(self) -> u8 {
        self.len
    }

    /// Returns the range of addresses covered by this prefix.
    pub fn range(self) -> (Addr, Addr) {
        (self.addr, self.addr.to_max(self.len))
    }

    /// Returns the smallest address covered by the prefix.
    pub fn min(self) -> Addr {
        self.addr
    }

    /// Returns the largest address covered by the prefix.
    pub fn max(self) -> Addr {
        self.addr.to_max(self.len)
    }

    /// Formats the prefix as an IPv4 prefix.
    pub fn fmt_v4(self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.addr.to_v4(), self.len)
    }

    /// Formats the prefix as an IPv6 prefix.
    pub fn fmt_v6(self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.addr.to_v6(), self.len)
    }

    /// Takes an encoded prefix from a source.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        family: AddressFamily,
    ) -> Result<Self, DecodeError<S::Error>> {
        let bits = BitString::take_from(cons)?;
        Self::from_bit_string(&bits, family).map_err(|err| {
            cons.content_err(err)
        })
    }

    /// Parses the content of an `IPAddress` value.
    pub fn parse_content<S: decode::Source>(
        content: &mut decode::Content<S>,
        family: AddressFamily,
    ) -> Result<Self, DecodeError<S::Error>> {
        let bits = BitString::from_content(content)?;
        Self::from_bit_string(&bits, family).map_err(|err| {
            content.content_err(err)
        })
    }
}


//--- PrimitiveContent

impl PrimitiveContent for Prefix {
    const TAG: Tag = Tag::BIT_STRING;

    fn encoded_len(&self, _: Mode) -> usize {
        if self.len % 8 == 0 {
            self.len as usize / 8 + 1
        }
        else {
            self.len as usize / 8 + 2
        }
    }

    fn write_encoded<W: io::Write>(
        &self,
        _: Mode,
        target: &mut W
    ) -> Result<(), io::Error> {
        // The type ensures that all the unused bits are zero, so we don’t
        // need to take care of that here.
        let addr = self.addr.to_bytes();
        if self.len % 8 == 0 {
            target.write_all(&[0])?;
            target.write_all(&addr[..(self.len / 8) as usize])
        }
        else {
            target.write_all(&[8 - self.len % 8])?;
            target.write_all(&addr[..(self.len / 8 + 1) as usize])
        }
    }
}


//------------ Addr ----------------------------------------------------------

/// An address.
///
/// This can be both an IPv4 and IPv6 address. It keeps the address
/// internally as a 128 bit unsigned integer. IPv6 addresses are kept in
/// there in host byte order while IPv4 addresses are kept in the upper four
/// bytes. This makes it possible to count prefix lengths the same way for
/// both families, starting from the top of the raw integer.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Addr(u128);

impl Addr {
    /// Creates a new address from 128 raw bits in host byte order.
    pub fn from_bits(bits: u128) -> Self {
        Addr(bits)
    }

    /// Creates a new address value for an IPv4 address.
    pub fn from_v4(addr: Ipv4Addr) -> Self {
        Addr::from_bits(u128::from(u32::from(addr)) << 96)
    }

    /// Creates a new address value for an IPv6 address.
    pub fn from_v6(addr: Ipv6Addr) -> Self {
        Addr::from_bits(u128::from(addr))
    }

    /// Returns the raw bits of the underlying integer.
    pub fn to_bits(self) -> u128 {
        self.0
    }

    /// Converts the address value into an IPv4 address.
    ///
    /// The method disregards the lower twelve bytes of the value.
    pub fn to_v4(self) -> Ipv4Addr {
        ((self.0 >> 96) as u32).into()
    }

    /// Converts the address value into an IPv6 address.
    pub fn to_v6(self) -> Ipv6Addr {
        self.0.into()
    }

    /// Returns a byte array for the address.
    pub fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    /// Returns an address with all but the first `prefix_len` bits cleared.
    ///
    /// The returned address is the smallest address in a prefix of this
    /// length.
    pub fn to_min(self, prefix_len: u8) -> Self {
        if prefix_len >= 128 {
            self
        }
        else {
            Addr(self.0 & !(!0 >> u32::from(prefix_len)))
        }
    }

    /// Returns an address with all but the first `prefix_len` bits set.
    ///
    /// The returned address is the largest address in a prefix of this
    /// length.
    pub fn to_max(self, prefix_len: u8) -> Self {
        if prefix_len >= 128 {
            self
        }
        else {
            Addr(self.0 | (!0 >> prefix_len as usize))
        }
    }
}


//--- From

impl From<u128> for Addr {
    fn from(addr: u128) -> Addr {
        Addr::from_bits(addr)
    }
}

impl From<Ipv4Addr> for Addr {
    fn from(addr: Ipv4Addr) -> Addr {
        Addr::from_v4(addr)
    }
}

impl From<Ipv6Addr> for Addr {
    fn from(addr: Ipv6Addr) -> Addr {
        Addr::from_v6(addr)
    }
}

impl From<IpAddr> for Addr {
    fn from(addr: IpAddr) -> Addr {
        match addr {
            IpAddr::V4(addr) => Addr::from(addr),
            IpAddr::V6(addr) => Addr::from(addr)
        }
    }
}


//------------ AddressFamily -------------------------------------------------

/// The address family of an IP resources value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddressFamily {
    /// IPv4.
    ///
    /// This is encoded by a two byte octet string with value `0x00 0x01`.
    Ipv4,

    /// IPv6.
    ///
    /// This is encoded by a two byte octet string with value `0x00 0x02`.
    Ipv6
}

impl AddressFamily {
    /// Takes a single address family from the beginning of a value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let str = OctetString::take_from(cons)?;
        let mut octets = str.octets();
        let (first, second) = match (octets.next(), octets.next()) {
            (Some(first), Some(second)) => (first, second),
            _ => return Err(cons.content_err("invalid address family")),
        };
        if octets.next().is_some() {
            return Err(cons.content_err("invalid address family"))
        }
        match (first, second) {
            (0, 1) => Ok(AddressFamily::Ipv4),
            (0, 2) => Ok(AddressFamily::Ipv6),
            _ => Err(cons.content_err("invalid address family")),
        }
    }

    /// Returns the maximum prefix length for this family.
    pub fn max_addr_len(self) -> u8 {
        match self {
            AddressFamily::Ipv4 => 32,
            AddressFamily::Ipv6 => 128
        }
    }

    /// Returns an encoder for the family.
    pub fn encode(self) -> impl encode::Values {
        OctetString::encode_slice(
            match self {
                AddressFamily::Ipv4 => b"\x00\x01",
                AddressFamily::Ipv6 => b"\x00\x02",
            }
        )
    }
}


//------------ AsBlocks ------------------------------------------------------

/// A set of AS number blocks.
///
/// Like [`IpBlocks`], the blocks are kept ordered and merged.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AsBlocks(Vec<AsBlock>);

impl AsBlocks {
    /// Creates an empty set.
    pub fn empty() -> Self {
        AsBlocks(Vec::new())
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the blocks in the set.
    pub fn iter(&self) -> impl Iterator<Item = &AsBlock> {
        self.0.iter()
    }

    /// Returns whether the set contains the other set in its entirety.
    pub fn contains(&self, other: &Self) -> bool {
        other.0.iter().all(|block| {
            self.0.iter().any(|outer| {
                outer.min() <= block.min() && block.max() <= outer.max()
            })
        })
    }

    /// Sorts and merges the blocks of the set.
    fn normalize(&mut self) {
        self.0.sort_by_key(|block| block.min());
        let mut res: Vec<AsBlock> = Vec::with_capacity(self.0.len());
        for block in self.0.drain(..) {
            if let Some(last) = res.last_mut() {
                let next = last.max().into_u32().checked_add(1);
                if next.map(|next| block.min().into_u32() <= next)
                       .unwrap_or(true) {
                    if block.max() > last.max() {
                        *last = AsBlock::from((last.min(), block.max()));
                    }
                    continue
                }
            }
            res.push(block);
        }
        self.0 = res;
    }
}

impl AsBlocks {
    /// Parses the content of an `ASIdsOrRanges` value.
    fn parse_content<S: decode::Source>(
        content: &mut decode::Content<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        let cons = content.as_constructed()?;
        let mut res = Vec::new();
        while let Some(block) = AsBlock::take_opt_from(cons)? {
            res.push(block)
        }
        if res.is_empty() {
            return Err(cons.content_err("empty AS blocks"))
        }
        Ok(res.into_iter().collect())
    }

    /// Returns an encoder for an `ASIdsOrRanges` value.
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        encode::sequence(
            encode::iter(self.0.iter().map(|block| block.encode()))
        )
    }
}


//--- FromStr and FromIterator

impl FromStr for AsBlocks {
    type Err = FromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',').map(|el| AsBlock::from_str(el.trim())).collect()
    }
}

impl FromIterator<AsBlock> for AsBlocks {
    fn from_iter<I: IntoIterator<Item = AsBlock>>(iter: I) -> Self {
        let mut res = AsBlocks(iter.into_iter().collect());
        res.normalize();
        res
    }
}


//--- Display

impl fmt::Display for AsBlocks {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for block in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            fmt::Display::fmt(block, f)?;
        }
        Ok(())
    }
}


//------------ AsBlock -------------------------------------------------------

/// A block of consecutive AS numbers.
#[derive(Clone, Copy, Debug)]
pub enum AsBlock {
    /// The block is a single AS number.
    Id(Asn),

    /// The block is a range of AS numbers.
    Range(AsRange),
}

impl AsBlock {
    /// The smallest AS number that is part of this block.
    pub fn min(&self) -> Asn {
        match *self {
            AsBlock::Id(id) => id,
            AsBlock::Range(ref range) => range.min(),
        }
    }

    /// The largest AS number that is still part of this block.
    pub fn max(&self) -> Asn {
        match *self {
            AsBlock::Id(id) => id,
            AsBlock::Range(ref range) => range.max(),
        }
    }
}

impl AsBlock {
    /// Takes an optional AS block from the beginning of an encoded value.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_value(|tag, content| {
            if tag == Tag::INTEGER {
                Asn::parse_content(content).map(AsBlock::Id)
            }
            else if tag == Tag::SEQUENCE {
                AsRange::parse_content(content).map(AsBlock::Range)
            }
            else {
                Err(content.content_err("invalid AS resources"))
            }
        })
    }

    /// Returns an encoder for an `ASIdOrRange` value.
    fn encode(self) -> impl encode::Values {
        match self {
            AsBlock::Id(inner) => encode::Choice2::One(inner.encode()),
            AsBlock::Range(inner) => encode::Choice2::Two(inner.encode()),
        }
    }
}


//--- From and FromStr

impl From<Asn> for AsBlock {
    fn from(id: Asn) -> Self {
        AsBlock::Id(id)
    }
}

impl From<AsRange> for AsBlock {
    fn from(range: AsRange) -> Self {
        AsBlock::Range(range)
    }
}

impl From<(Asn, Asn)> for AsBlock {
    fn from(range: (Asn, Asn)) -> Self {
        if range.0 == range.1 {
            AsBlock::Id(range.0)
        }
        else {
            AsBlock::Range(AsRange::new(range.0, range.1))
        }
    }
}

impl FromStr for AsBlock {
    type Err = FromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.find('-') {
            None => Ok(AsBlock::Id(Asn::from_str(s)?)),
            Some(pos) => {
                if s.len() < pos + 2 {
                    return Err(FromStrError::BadRange)
                }
                let min = Asn::from_str(&s[..pos])?;
                let max = Asn::from_str(&s[pos + 1..])?;
                if min > max {
                    return Err(FromStrError::BadRange)
                }
                Ok(AsBlock::Range(AsRange::new(min, max)))
            }
        }
    }
}


//--- PartialEq, Eq, and Display

impl PartialEq for AsBlock {
    fn eq(&self, other: &Self) -> bool {
        self.min() == other.min() && self.max() == other.max()
    }
}

impl Eq for AsBlock {}

impl fmt::Display for AsBlock {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AsBlock::Id(id) => fmt::Display::fmt(id, f),
            AsBlock::Range(range) => {
                write!(f, "{}-{}", range.min(), range.max())
            }
        }
    }
}


//------------ AsRange -------------------------------------------------------

/// A range of AS numbers, inclusive at both ends.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct AsRange {
    min: Asn,
    max: Asn,
}

impl AsRange {
    /// Creates a new range from the smallest and largest number.
    pub fn new(min: Asn, max: Asn) -> Self {
        AsRange { min, max }
    }

    /// Returns the smallest AS number that is part of this range.
    pub fn min(&self) -> Asn {
        self.min
    }

    /// Returns the largest AS number that is still part of this range.
    pub fn max(&self) -> Asn {
        self.max
    }
}

impl AsRange {
    /// Parses the content of an `ASRange` value.
    fn parse_content<S: decode::Source>(
        content: &mut decode::Content<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        let cons = content.as_constructed()?;
        Ok(AsRange {
            min: Asn::take_from(cons)?,
            max: Asn::take_from(cons)?,
        })
    }

    /// Returns an encoder for an `ASRange` value.
    fn encode(self) -> impl encode::Values {
        encode::sequence((
            self.min.encode(),
            self.max.encode(),
        ))
    }
}


//------------ Asn -----------------------------------------------------------

/// An AS number.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Asn(u32);

impl Asn {
    pub const MIN: Asn = Asn(u32::MIN);
    pub const MAX: Asn = Asn(u32::MAX);

    /// Creates an AS number from a `u32`.
    pub fn from_u32(value: u32) -> Self {
        Asn(value)
    }

    /// Converts an AS number into a `u32`.
    pub fn into_u32(self) -> u32 {
        self.0
    }
}

impl Asn {
    /// Takes an AS number from the beginning of an encoded value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_u32().map(Asn)
    }

    /// Parses the content of an AS number value.
    pub fn parse_content<S: decode::Source>(
        content: &mut decode::Content<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        content.to_u32().map(Asn)
    }

    /// Returns an encoder for the AS number.
    pub fn encode(self) -> impl encode::Values {
        self.0.encode()
    }
}


//--- From, FromStr, and Display

impl From<u32> for Asn {
    fn from(id: u32) -> Self {
        Asn(id)
    }
}

impl From<Asn> for u32 {
    fn from(id: Asn) -> Self {
        id.0
    }
}

impl FromStr for Asn {
    type Err = FromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = if s.len() > 2 && s[..2].eq_ignore_ascii_case("as") {
            &s[2..]
        } else {
            s
        };
        u32::from_str(s).map(Asn).map_err(|_| FromStrError::BadAsn)
    }
}

impl fmt::Display for Asn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AS{}", self.0)
    }
}


//------------ ResourceSet ---------------------------------------------------

/// The complete set of Internet number resources of a certificate.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ResourceSet {
    /// The IPv4 address resources.
    v4: IpBlocks,

    /// The IPv6 address resources.
    v6: IpBlocks,

    /// The AS number resources.
    asn: AsBlocks,
}

impl ResourceSet {
    /// Creates a new resource set from its parts.
    pub fn new(v4: IpBlocks, v6: IpBlocks, asn: AsBlocks) -> Self {
        ResourceSet { v4, v6, asn }
    }

    /// Creates an empty resource set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a resource set from string representations of the parts.
    ///
    /// Empty strings result in the empty set for that part.
    pub fn from_strs(
        v4: &str, v6: &str, asn: &str
    ) -> Result<Self, FromStrError> {
        Ok(ResourceSet {
            v4: if v4.is_empty() { IpBlocks::empty() }
                else { IpBlocks::from_v4_str(v4)? },
            v6: if v6.is_empty() { IpBlocks::empty() }
                else { IpBlocks::from_v6_str(v6)? },
            asn: if asn.is_empty() { AsBlocks::empty() }
                 else { AsBlocks::from_str(asn)? },
        })
    }

    /// Returns the IPv4 resources of the set.
    pub fn v4(&self) -> &IpBlocks {
        &self.v4
    }

    /// Returns the IPv6 resources of the set.
    pub fn v6(&self) -> &IpBlocks {
        &self.v6
    }

    /// Returns the AS number resources of the set.
    pub fn asn(&self) -> &AsBlocks {
        &self.asn
    }

    /// Returns whether the set is empty in all three parts.
    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty() && self.asn.is_empty()
    }

    /// Returns whether the set contains the other set in its entirety.
    pub fn contains(&self, other: &Self) -> bool {
        self.v4.contains(&other.v4)
            && self.v6.contains(&other.v6)
            && self.asn.contains(&other.asn)
    }
}


//--- Display

impl fmt::Display for ResourceSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f, "v4: {}, v6: {}, asn: {}",
            self.v4.display_v4(), self.v6.display_v6(), self.asn
        )
    }
}


//------------ Resources -----------------------------------------------------

/// The resources of a certificate.
///
/// A certificate either carries its resources explicitly or inherits all of
/// them from its issuer. RFC 3779 technically allows inheriting per address
/// family, but mixing inherited and explicit resources on one certificate
/// is not used in practice and is rejected when decoding.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Resources {
    /// All resources are inherited from the issuer.
    Inherit,

    /// The resources are given explicitly.
    Blocks(ResourceSet),
}

impl Resources {
    /// Returns whether the resources are inherited.
    pub fn is_inherited(&self) -> bool {
        matches!(self, Resources::Inherit)
    }

    /// Returns a reference to the explicit resource set if there is one.
    pub fn as_set(&self) -> Option<&ResourceSet> {
        match self {
            Resources::Inherit => None,
            Resources::Blocks(ref set) => Some(set),
        }
    }

    /// Resolves the resources relative to the issuer’s effective set.
    ///
    /// For inherited resources this is the issuer’s set itself.
    pub fn resolve<'a>(&'a self, issuer: &'a ResourceSet) -> &'a ResourceSet {
        match self {
            Resources::Inherit => issuer,
            Resources::Blocks(ref set) => set,
        }
    }
}

impl From<ResourceSet> for Resources {
    fn from(set: ResourceSet) -> Self {
        Resources::Blocks(set)
    }
}


//------------ FromStrError --------------------------------------------------

/// A string does not contain a valid resource representation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FromStrError {
    /// The string does not contain a valid address.
    BadAddr,

    /// A prefix length is out of range for the family.
    BadPrefixLen,

    /// A range has its ends in the wrong order or is otherwise broken.
    BadRange,

    /// The string does not contain a valid AS number.
    BadAsn,
}

impl From<AddrParseError> for FromStrError {
    fn from(_: AddrParseError) -> Self {
        FromStrError::BadAddr
    }
}

impl From<std::num::ParseIntError> for FromStrError {
    fn from(_: std::num::ParseIntError) -> Self {
        FromStrError::BadPrefixLen
    }
}

impl fmt::Display for FromStrError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(
            match self {
                FromStrError::BadAddr => "invalid IP address",
                FromStrError::BadPrefixLen => "invalid prefix length",
                FromStrError::BadRange => "invalid range",
                FromStrError::BadAsn => "invalid AS number",
            }
        )
    }
}

impl std::error::Error for FromStrError { }


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn addr_to_min_max() {
        assert_eq!(
            Addr(0x1234_5678_1234_5678_1234_5678_1234_5678).to_min(11).0,
            0x1220_0000_0000_0000_0000_0000_0000_0000,
        );
        assert_eq!(
            Addr(0x1234_5678_1234_5678_1234_5678_1234_5678).to_max(11).0,
            0x123f_ffff_ffff_ffff_ffff_ffff_ffff_ffff,
        );
    }

    #[test]
    fn range_into_prefix() {
        let range = AddressRange::new(
            Addr::from(Ipv4Addr::new(10, 0, 0, 0)),
            Addr::from(Ipv4Addr::new(10, 0, 0, 255)).to_max(32),
        );
        assert_eq!(
            range.into_prefix().unwrap(),
            Prefix::new(Ipv4Addr::new(10, 0, 0, 0), 24)
        );

        let range = AddressRange::new(
            Addr::from(Ipv4Addr::new(10, 0, 0, 0)),
            Addr::from(Ipv4Addr::new(10, 0, 1, 17)).to_max(32),
        );
        assert!(range.into_prefix().is_err());
    }

    #[test]
    fn ip_blocks_merge() {
        let blocks = IpBlocks::from_v4_str(
            "10.0.1.0/24, 10.0.0.0/24, 10.0.2.0-10.0.2.17"
        ).unwrap();
        assert_eq!(blocks.iter().count(), 1);
        assert_eq!(
            blocks.iter().next().unwrap().min(),
            Addr::from(Ipv4Addr::new(10, 0, 0, 0))
        );
    }

    #[test]
    fn ip_blocks_contains() {
        let outer = IpBlocks::from_v4_str("10.0.0.0/8").unwrap();
        let inner = IpBlocks::from_v4_str("10.0.0.0/16").unwrap();
        let other = IpBlocks::from_v4_str("192.0.2.0/24").unwrap();
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(!outer.contains(&other));
        assert!(outer.contains(&IpBlocks::empty()));
    }

    #[test]
    fn as_blocks_from_str() {
        let blocks = AsBlocks::from_str("AS1, AS64496-AS64511").unwrap();
        let inner = AsBlocks::from_str("AS64500").unwrap();
        assert!(blocks.contains(&inner));
        assert!(!inner.contains(&blocks));
        assert!(AsBlocks::from_str("AS3-AS1").is_err());
    }

    #[test]
    fn resource_set_contains() {
        let parent = ResourceSet::from_strs(
            "10.0.0.0/8", "2001:db8::/32", "AS64496-AS64511"
        ).unwrap();
        let child = ResourceSet::from_strs(
            "10.0.0.0/16", "", "AS64496"
        ).unwrap();
        assert!(parent.contains(&child));
        assert!(!child.contains(&parent));
        assert!(parent.contains(&ResourceSet::empty()));
    }

    #[test]
    fn resolve_inherited() {
        let parent = ResourceSet::from_strs("10.0.0.0/8", "", "").unwrap();
        let inherit = Resources::Inherit;
        let own = Resources::Blocks(
            ResourceSet::from_strs("10.0.0.0/16", "", "").unwrap()
        );
        assert_eq!(inherit.resolve(&parent), &parent);
        assert_eq!(
            own.resolve(&parent),
            &ResourceSet::from_strs("10.0.0.0/16", "", "").unwrap()
        );
    }

    #[test]
    fn prefix_encode_decode() {
        use bcder::decode::Constructed;
        use bcder::encode::Values;

        let prefix = Prefix::new(Ipv4Addr::new(10, 0, 0, 0), 12);
        let mut target = Vec::new();
        prefix.encode().write_encoded(Mode::Der, &mut target).unwrap();
        let decoded = Constructed::decode(
            target.as_slice(), Mode::Der,
            |cons| Prefix::take_from(cons, AddressFamily::Ipv4)
        ).unwrap();
        assert_eq!(prefix, decoded);
    }
}
