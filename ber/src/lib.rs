//! Tag-length-value engine for BER, DER and CER.
//!
//! [`Tlv`] is one node of the encoding: its [`Tag`], its content (raw
//! bytes for a primitive node, child nodes for a constructed one) and,
//! for decoded nodes, the exact header and content octets consumed from
//! the source buffer. Decoding is BER-lenient: definite and indefinite
//! lengths are both accepted regardless of what produced them.
//! Encoding picks its form from the [`Ruleset`]: DER writes definite
//! lengths everywhere, CER writes constructed nodes with the indefinite
//! form terminated by an end-of-contents marker.
//!
//! [`Ber`] holds a flat list of top-level nodes, mirroring how a raw
//! buffer may carry several concatenated values.

use nom::error::ErrorKind;
use nom::{IResult, Parser};

use kumiki::decoder::{DecodableFrom, Decoder};
use kumiki::encoder::{EncodableTo, Encoder};

pub mod error;
pub mod tag;

pub use error::Error;
pub use tag::{Class, MAX_TAG_NUMBER, TAG_CONSTRUCTED, Tag, UniversalTag};

type BerResult<'a, T> = IResult<&'a [u8], T, Error>;

/// Output ruleset selection for encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ruleset {
    /// Definite lengths everywhere, canonical form.
    #[default]
    Der,
    /// Indefinite-length constructed encoding with end-of-contents
    /// markers; primitives are unchanged.
    Cer,
}

/// The content side of a node: raw payload bytes or child nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Primitive(Vec<u8>),
    Constructed(Vec<Tlv>),
}

/// One tag-length-value node.
///
/// Nodes built in memory carry empty `header`/`raw_content` buffers;
/// decoded nodes keep the exact octets consumed from the wire so callers
/// can re-extract the bytes that were signed. The captured buffers do
/// not participate in equality.
#[derive(Debug, Clone)]
pub struct Tlv {
    tag: Tag,
    content: Content,
    header: Vec<u8>,
    raw_content: Vec<u8>,
}

impl PartialEq for Tlv {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.content == other.content
    }
}

impl Eq for Tlv {}

impl Tlv {
    /// Builds a primitive node. The tag's constructed flag is forced off.
    pub fn new_primitive(tag: Tag, data: Vec<u8>) -> Self {
        Tlv {
            tag: Tag {
                constructed: false,
                ..tag
            },
            content: Content::Primitive(data),
            header: Vec::new(),
            raw_content: Vec::new(),
        }
    }

    /// Builds a constructed node. The tag's constructed flag is forced on.
    pub fn new_constructed(tag: Tag, children: Vec<Tlv>) -> Self {
        Tlv {
            tag: Tag {
                constructed: true,
                ..tag
            },
            content: Content::Constructed(children),
            header: Vec::new(),
            raw_content: Vec::new(),
        }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Payload bytes of a primitive node.
    pub fn data(&self) -> Option<&[u8]> {
        match &self.content {
            Content::Primitive(data) => Some(data),
            Content::Constructed(_) => None,
        }
    }

    /// Child nodes of a constructed node.
    pub fn tlvs(&self) -> Option<&[Tlv]> {
        match &self.content {
            Content::Primitive(_) => None,
            Content::Constructed(children) => Some(children),
        }
    }

    /// The tag and length octets as read from the wire. Empty for nodes
    /// built in memory.
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// The content octets as read from the wire (for an indefinite-length
    /// node this includes the end-of-contents marker). Empty for nodes
    /// built in memory.
    pub fn raw_content(&self) -> &[u8] {
        &self.raw_content
    }

    /// Total bytes this node consumed from the source buffer.
    pub fn consumed_len(&self) -> usize {
        self.header.len() + self.raw_content.len()
    }

    /// Parses one node from the front of `input`, returning the rest.
    pub fn parse(input: &[u8]) -> BerResult<'_, Tlv> {
        let start = input;
        let (input, tag) = parse_tag(input)?;
        let (input, length) = parse_length(input)?;
        let header = start[..start.len() - input.len()].to_vec();

        match length {
            Some(len) => {
                let (rest, content) = nom::bytes::complete::take(len).parse(input)?;
                if tag.constructed {
                    let mut children = Vec::new();
                    let mut remaining = content;
                    while !remaining.is_empty() {
                        // a child running past the declared container
                        // length surfaces as EOF inside the slice
                        let (r, child) = Tlv::parse(remaining).map_err(|e| match e {
                            nom::Err::Error(Error::Parser(ErrorKind::Eof)) => {
                                nom::Err::Failure(Error::LengthMismatch)
                            }
                            other => other,
                        })?;
                        remaining = r;
                        children.push(child);
                    }
                    Ok((
                        rest,
                        Tlv {
                            tag,
                            content: Content::Constructed(children),
                            header,
                            raw_content: content.to_vec(),
                        },
                    ))
                } else {
                    Ok((
                        rest,
                        Tlv {
                            tag,
                            content: Content::Primitive(content.to_vec()),
                            header,
                            raw_content: content.to_vec(),
                        },
                    ))
                }
            }
            None => {
                if !tag.constructed {
                    return Err(nom::Err::Failure(Error::PrimitiveIndefiniteLength));
                }
                let mut children = Vec::new();
                let mut remaining = input;
                loop {
                    if remaining.is_empty() {
                        return Err(nom::Err::Failure(Error::UnterminatedIndefinite));
                    }
                    let (r, child) = Tlv::parse(remaining)?;
                    remaining = r;
                    if child.tag.is_end_of_contents() {
                        // consumed but not kept as a child
                        break;
                    }
                    children.push(child);
                }
                let consumed = input.len() - remaining.len();
                Ok((
                    remaining,
                    Tlv {
                        tag,
                        content: Content::Constructed(children),
                        header,
                        raw_content: input[..consumed].to_vec(),
                    },
                ))
            }
        }
    }

    /// Serializes this node under the given ruleset.
    pub fn to_bytes(&self, ruleset: Ruleset) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out, ruleset);
        out
    }

    fn write(&self, out: &mut Vec<u8>, ruleset: Ruleset) {
        out.extend_from_slice(&self.tag.to_bytes());
        match &self.content {
            Content::Primitive(data) => {
                write_length(out, data.len());
                out.extend_from_slice(data);
            }
            Content::Constructed(children) => match ruleset {
                Ruleset::Der => {
                    let mut body = Vec::new();
                    for child in children {
                        child.write(&mut body, ruleset);
                    }
                    write_length(out, body.len());
                    out.extend_from_slice(&body);
                }
                Ruleset::Cer => {
                    out.push(0x80);
                    for child in children {
                        child.write(out, ruleset);
                    }
                    out.extend_from_slice(&[0x00, 0x00]);
                }
            },
        }
    }
}

fn parse_tag(input: &[u8]) -> BerResult<'_, Tag> {
    let (mut input, first) = nom::number::be_u8().parse(input)?;
    let class = Class::from(first >> 6);
    let constructed = first & TAG_CONSTRUCTED != 0;
    let mut number = (first & 0x1f) as u64;
    if number == 0x1f {
        // long form: base-128 groups, high bit marks continuation
        number = 0;
        loop {
            if number > MAX_TAG_NUMBER >> 7 {
                return Err(nom::Err::Failure(Error::TagNumberOverflow));
            }
            let (rest, b) = nom::number::be_u8().parse(input)?;
            input = rest;
            number = (number << 7) | (b & 0x7f) as u64;
            if b & 0x80 == 0 {
                break;
            }
        }
    }
    Ok((
        input,
        Tag {
            class,
            number,
            constructed,
        },
    ))
}

fn parse_length(input: &[u8]) -> BerResult<'_, Option<u64>> {
    let (input, first) = nom::number::be_u8().parse(input)?;
    if first & 0x80 == 0 {
        // short form: 0-127
        return Ok((input, Some(first as u64)));
    }
    let count = (first & 0x7f) as u64;
    if count == 0 {
        return Ok((input, None));
    }
    if count > 6 {
        return Err(nom::Err::Failure(Error::LengthOverflow));
    }
    let (input, bytes) = nom::bytes::complete::take(count).parse(input)?;
    let len = bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64);
    Ok((input, Some(len)))
}

fn write_length(out: &mut Vec<u8>, len: usize) {
    if len <= 0x7f {
        out.push(len as u8);
        return;
    }
    let bytes = (len as u64).to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    let significant = &bytes[skip..];
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

/// A flat, ordered list of top-level nodes decoded from one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ber {
    elements: Vec<Tlv>,
}

impl Ber {
    pub fn new(elements: Vec<Tlv>) -> Self {
        Ber { elements }
    }

    pub fn elements(&self) -> &[Tlv] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<Tlv> {
        self.elements
    }

    /// Parses every node in the buffer.
    pub fn from_bytes(mut input: &[u8]) -> Result<Self, Error> {
        let mut elements = Vec::new();
        while !input.is_empty() {
            let (rest, tlv) = Tlv::parse(input)?;
            input = rest;
            elements.push(tlv);
        }
        Ok(Ber { elements })
    }

    /// Serializes every node under the given ruleset.
    pub fn to_bytes(&self, ruleset: Ruleset) -> Vec<u8> {
        let mut out = Vec::new();
        for element in &self.elements {
            element.write(&mut out, ruleset);
        }
        out
    }
}

impl DecodableFrom<Vec<u8>> for Ber {}

impl Decoder<Vec<u8>, Ber> for Vec<u8> {
    type Error = Error;

    fn decode(&self) -> Result<Ber, Self::Error> {
        Ber::from_bytes(self)
    }
}

impl DecodableFrom<&[u8]> for Ber {}

impl Decoder<&[u8], Ber> for &[u8] {
    type Error = Error;

    fn decode(&self) -> Result<Ber, Self::Error> {
        Ber::from_bytes(self)
    }
}

impl EncodableTo<Ber> for Vec<u8> {}

impl Encoder<Ber, Vec<u8>> for Ber {
    type Error = Error;

    fn encode(&self) -> Result<Vec<u8>, Self::Error> {
        Ok(self.to_bytes(Ruleset::Der))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::{Class, Error, Ruleset, Tag, Tlv, UniversalTag, parse_length, parse_tag};

    #[rstest(
        input,
        expected,
        case(vec![0x02], Tag::universal(UniversalTag::Integer)),
        case(vec![0x30, 0x01], Tag::constructed(UniversalTag::Sequence)),
        case(vec![0xa0], Tag::context(0, true)),
        case(vec![0x83], Tag::context(3, false)),
        case(vec![0x61], Tag::application(1, true)),
        case(vec![0xc1], Tag::private(1, false)),
        // long form
        case(vec![0xbf, 0x1f], Tag::context(31, true)),
        case(vec![0x9f, 0x81, 0x00], Tag::context(128, false)),
        case(vec![0x1f, 0x81, 0x80, 0x00], Tag { class: Class::Universal, number: 0x4000, constructed: false })
    )]
    fn test_parse_tag(input: Vec<u8>, expected: Tag) {
        let (_, actual) = parse_tag(&input).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_parse_tag_roundtrips_through_to_bytes() {
        for tag in [
            Tag::universal(UniversalTag::Integer),
            Tag::context(31, true),
            Tag::context(128, false),
            Tag::private(7, true),
            Tag::application(200, false),
        ] {
            let bytes = tag.to_bytes();
            let (rest, parsed) = parse_tag(&bytes).unwrap();
            assert!(rest.is_empty());
            assert_eq!(tag, parsed);
        }
    }

    #[test]
    fn test_parse_tag_overflow() {
        let mut input = vec![0x1f];
        input.extend(std::iter::repeat_n(0xff, 8));
        input.push(0x7f);
        let err = Tlv::parse(&input).unwrap_err();
        assert!(matches!(
            err,
            nom::Err::Failure(Error::TagNumberOverflow)
        ));
    }

    #[rstest(
        input,
        expected,
        case(vec![0x02], Some(0x02)),
        case(vec![0x7f], Some(0x7f)),
        case(vec![0x82, 0x02, 0x10], Some(256 * 0x02 + 0x10)),
        case(vec![0x83, 0x01, 0x00, 0x00], Some(256 * 256)),
        case(vec![0x80], None)
    )]
    fn test_parse_length(input: Vec<u8>, expected: Option<u64>) {
        let (_, actual) = parse_length(&input).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_parse_length_overflow() {
        let input = vec![0x87, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let err = parse_length(&input).unwrap_err();
        assert!(matches!(err, nom::Err::Failure(Error::LengthOverflow)));
    }

    #[rstest(
        input,
        tag,
        data,
        case(vec![0x02, 0x01, 0x01], Tag::universal(UniversalTag::Integer), vec![0x01]),
        case(vec![0x13, 0x02, 0x68, 0x69], Tag::universal(UniversalTag::PrintableString), vec![0x68, 0x69]),
        case(vec![0x0c, 0x04, 0xf0, 0x9f, 0x98, 0x8e], Tag::universal(UniversalTag::Utf8String), vec![0xf0, 0x9f, 0x98, 0x8e]),
        case(vec![0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b], Tag::universal(UniversalTag::ObjectIdentifier), vec![0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b]),
        case(vec![0x05, 0x00], Tag::universal(UniversalTag::Null), vec![]),
        case(vec![0x04, 0x04, 0x03, 0x02, 0x06, 0xa0], Tag::universal(UniversalTag::OctetString), vec![0x03, 0x02, 0x06, 0xa0]),
        case(vec![0x03, 0x04, 0x06, 0x6e, 0x5d, 0xc0], Tag::universal(UniversalTag::BitString), vec![0x06, 0x6e, 0x5d, 0xc0])
    )]
    fn test_tlv_parse_primitive(input: Vec<u8>, tag: Tag, data: Vec<u8>) {
        let (rest, tlv) = Tlv::parse(&input).unwrap();
        assert!(rest.is_empty());
        assert_eq!(&tag, tlv.tag());
        assert_eq!(Some(data.as_slice()), tlv.data());
    }

    #[test]
    fn test_tlv_parse_constructed() {
        let input = vec![0x30, 0x09, 0x02, 0x01, 0x07, 0x02, 0x01, 0x08, 0x02, 0x01, 0x09];
        let (rest, tlv) = Tlv::parse(&input).unwrap();
        assert!(rest.is_empty());
        assert_eq!(&Tag::constructed(UniversalTag::Sequence), tlv.tag());
        let children = tlv.tlvs().unwrap();
        assert_eq!(3, children.len());
        assert_eq!(Some([0x07].as_slice()), children[0].data());
        assert_eq!(Some([0x08].as_slice()), children[1].data());
        assert_eq!(Some([0x09].as_slice()), children[2].data());
    }

    #[test]
    fn test_header_and_content_account_for_every_byte() {
        let input = vec![0x30, 0x09, 0x02, 0x01, 0x07, 0x02, 0x01, 0x08, 0x02, 0x01, 0x09];
        let (_, tlv) = Tlv::parse(&input).unwrap();
        assert_eq!(input.len(), tlv.consumed_len());
        assert_eq!(&input[..2], tlv.header());
        assert_eq!(&input[2..], tlv.raw_content());
        let consumed: usize = tlv.tlvs().unwrap().iter().map(Tlv::consumed_len).sum();
        assert_eq!(tlv.raw_content().len(), consumed);
    }

    #[test]
    fn test_indefinite_length_decodes_like_definite() {
        let definite = vec![0x30, 0x06, 0x02, 0x01, 0x07, 0x02, 0x01, 0x08];
        let indefinite = vec![0x30, 0x80, 0x02, 0x01, 0x07, 0x02, 0x01, 0x08, 0x00, 0x00];
        let (_, a) = Tlv::parse(&definite).unwrap();
        let (_, b) = Tlv::parse(&indefinite).unwrap();
        assert_eq!(a, b);
        // the end-of-contents marker is consumed but not kept
        assert_eq!(2, b.tlvs().unwrap().len());
        assert_eq!(indefinite.len(), b.consumed_len());
    }

    #[test]
    fn test_nested_indefinite_length() {
        let input = vec![
            0x30, 0x80, 0x30, 0x80, 0x02, 0x01, 0x07, 0x00, 0x00, 0x00, 0x00,
        ];
        let (_, tlv) = Tlv::parse(&input).unwrap();
        let inner = &tlv.tlvs().unwrap()[0];
        assert_eq!(&Tag::constructed(UniversalTag::Sequence), inner.tag());
        assert_eq!(Some([0x07].as_slice()), inner.tlvs().unwrap()[0].data());
    }

    #[rstest(
        input,
        case(vec![0x30, 0x03, 0x02, 0x04, 0x01]),
        case(vec![0x30, 0x02, 0x02, 0x03])
    )]
    fn test_child_overrunning_container_is_length_mismatch(input: Vec<u8>) {
        let err = Tlv::parse(&input).unwrap_err();
        assert!(matches!(err, nom::Err::Failure(Error::LengthMismatch)));
    }

    #[test]
    fn test_primitive_indefinite_length_is_fatal() {
        let input = vec![0x04, 0x80, 0x00, 0x00];
        let err = Tlv::parse(&input).unwrap_err();
        assert!(matches!(
            err,
            nom::Err::Failure(Error::PrimitiveIndefiniteLength)
        ));
    }

    #[test]
    fn test_unterminated_indefinite_length_is_fatal() {
        let input = vec![0x30, 0x80, 0x02, 0x01, 0x07];
        let err = Tlv::parse(&input).unwrap_err();
        assert!(matches!(
            err,
            nom::Err::Failure(Error::UnterminatedIndefinite)
        ));
    }

    #[test]
    fn test_der_encode() {
        let tlv = Tlv::new_constructed(
            Tag::constructed(UniversalTag::Sequence),
            vec![Tlv::new_primitive(
                Tag::universal(UniversalTag::Integer),
                vec![0x07],
            )],
        );
        assert_eq!(
            vec![0x30, 0x03, 0x02, 0x01, 0x07],
            tlv.to_bytes(Ruleset::Der)
        );
    }

    #[test]
    fn test_cer_encode_uses_indefinite_length() {
        let tlv = Tlv::new_constructed(
            Tag::constructed(UniversalTag::Sequence),
            vec![Tlv::new_primitive(
                Tag::universal(UniversalTag::Integer),
                vec![0x07],
            )],
        );
        assert_eq!(
            vec![0x30, 0x80, 0x02, 0x01, 0x07, 0x00, 0x00],
            tlv.to_bytes(Ruleset::Cer)
        );
    }

    #[rstest(ruleset, case(Ruleset::Der), case(Ruleset::Cer))]
    fn test_roundtrip_under_both_rulesets(ruleset: Ruleset) {
        let tlv = Tlv::new_constructed(
            Tag::constructed(UniversalTag::Sequence),
            vec![
                Tlv::new_primitive(Tag::universal(UniversalTag::Integer), vec![0x07]),
                Tlv::new_constructed(
                    Tag::constructed(UniversalTag::Set),
                    vec![Tlv::new_primitive(
                        Tag::universal(UniversalTag::Utf8String),
                        b"hi".to_vec(),
                    )],
                ),
                Tlv::new_primitive(Tag::context(0, false), vec![0xde, 0xad]),
            ],
        );
        let bytes = tlv.to_bytes(ruleset);
        let (rest, parsed) = Tlv::parse(&bytes).unwrap();
        assert!(rest.is_empty());
        assert_eq!(tlv, parsed);
    }

    #[test]
    fn test_long_form_length_roundtrip() {
        let data = vec![0xab; 200];
        let tlv = Tlv::new_primitive(Tag::universal(UniversalTag::OctetString), data.clone());
        let bytes = tlv.to_bytes(Ruleset::Der);
        assert_eq!(&[0x04, 0x81, 0xc8], &bytes[..3]);
        let (_, parsed) = Tlv::parse(&bytes).unwrap();
        assert_eq!(Some(data.as_slice()), parsed.data());
    }

    #[test]
    fn test_ber_decodes_multiple_top_level_elements() {
        use kumiki::decoder::Decoder;

        let input: Vec<u8> = vec![0x02, 0x01, 0x07, 0x05, 0x00];
        let ber: crate::Ber = input.decode().unwrap();
        assert_eq!(2, ber.elements().len());
        assert_eq!(
            &Tag::universal(UniversalTag::Integer),
            ber.elements()[0].tag()
        );
        assert_eq!(&Tag::universal(UniversalTag::Null), ber.elements()[1].tag());
    }

    #[test]
    fn test_constructed_node_has_no_primitive_data() {
        let tlv = Tlv::new_constructed(Tag::constructed(UniversalTag::Sequence), vec![]);
        assert!(tlv.data().is_none());
        assert_eq!(Some([].as_slice()), tlv.tlvs());
        assert_eq!(vec![0x30, 0x00], tlv.to_bytes(Ruleset::Der));
    }
}
