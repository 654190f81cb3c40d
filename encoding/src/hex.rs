//! Hexadecimal conversion with selectable byte order.
//!
//! Non-hex characters are stripped on decode and odd-length input is
//! zero-padded on the left (the stray nibble is the most significant
//! one). The endian flag reverses byte order, never nibble order.

use std::fmt::Write;

/// Byte order for [`decode`]/[`encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Big,
    Little,
}

/// Decodes hex text to bytes. Upper and lower case are both accepted.
pub fn decode(s: &str, endian: Endian) -> Vec<u8> {
    let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(16)).collect();
    let mut nibbles = digits;
    if nibbles.len() % 2 != 0 {
        nibbles.insert(0, 0);
    }
    let mut bytes: Vec<u8> = nibbles
        .chunks(2)
        .map(|pair| ((pair[0] << 4) | pair[1]) as u8)
        .collect();
    if endian == Endian::Little {
        bytes.reverse();
    }
    bytes
}

/// Encodes bytes as lowercase hex text.
pub fn encode(data: &[u8], endian: Endian) -> String {
    let mut s = String::with_capacity(data.len() * 2);
    match endian {
        Endian::Big => {
            for b in data {
                let _ = write!(s, "{:02x}", b);
            }
        }
        Endian::Little => {
            for b in data.iter().rev() {
                let _ = write!(s, "{:02x}", b);
            }
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::Endian;

    #[rstest(
        input,
        endian,
        expected,
        case("010203", Endian::Big, vec![0x01, 0x02, 0x03]),
        case("010203", Endian::Little, vec![0x03, 0x02, 0x01]),
        case("FFab", Endian::Big, vec![0xff, 0xab]),
        // odd length: the stray nibble is most significant
        case("fff", Endian::Big, vec![0x0f, 0xff]),
        case("1", Endian::Big, vec![0x01]),
        // foreign characters are stripped
        case("01:02:03", Endian::Big, vec![0x01, 0x02, 0x03]),
        case("01 02\r\n03", Endian::Big, vec![0x01, 0x02, 0x03]),
        case("", Endian::Big, vec![])
    )]
    fn test_decode(input: &str, endian: Endian, expected: Vec<u8>) {
        assert_eq!(expected, super::decode(input, endian));
    }

    #[rstest(
        input,
        endian,
        expected,
        case(vec![0x01, 0x02, 0x03], Endian::Big, "010203"),
        case(vec![0x01, 0x02, 0x03], Endian::Little, "030201"),
        case(vec![0xff, 0xab, 0xcd], Endian::Big, "ffabcd"),
        case(vec![], Endian::Big, "")
    )]
    fn test_encode(input: Vec<u8>, endian: Endian, expected: &str) {
        assert_eq!(expected, super::encode(&input, endian));
    }

    #[rstest(input, case(vec![]), case(vec![0x00, 0x01]), case(vec![0xde, 0xad, 0xbe, 0xef]))]
    fn test_roundtrip_both_orders(input: Vec<u8>) {
        for endian in [Endian::Big, Endian::Little] {
            let text = super::encode(&input, endian);
            assert_eq!(input, super::decode(&text, endian));
        }
    }
}
