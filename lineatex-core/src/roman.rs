use thiserror::Error;

/// A roman numeral that cannot be decoded, or an integer that cannot be
/// encoded. Never fatal in the pipeline — the parser degrades to sequential
/// numbering and records a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedOrdinal {
    #[error("empty roman numeral")]
    Empty,
    #[error("invalid roman numeral character {0:?}")]
    InvalidCharacter(char),
    #[error("non-canonical roman numeral {0:?}")]
    NonCanonical(String),
    #[error("value {0} outside encodable range 1..=3999")]
    OutOfRange(u32),
}

const DIGIT_VALUES: [(char, u32); 7] = [
    ('i', 1),
    ('v', 5),
    ('x', 10),
    ('l', 50),
    ('c', 100),
    ('d', 500),
    ('m', 1000),
];

fn digit_value(c: char) -> Result<u32, MalformedOrdinal> {
    DIGIT_VALUES
        .iter()
        .find(|(d, _)| *d == c)
        .map(|(_, v)| *v)
        .ok_or(MalformedOrdinal::InvalidCharacter(c))
}

/// Decode a roman numeral, case-insensitive. Rejects non-canonical forms
/// ("iiii", "iix") by re-encoding the decoded value and comparing.
pub fn decode(roman: &str) -> Result<u32, MalformedOrdinal> {
    let normalized = roman.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(MalformedOrdinal::Empty);
    }

    let mut total: i64 = 0;
    let chars: Vec<char> = normalized.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        let value = i64::from(digit_value(c)?);
        let next_value = match chars.get(i + 1) {
            Some(&n) => i64::from(digit_value(n)?),
            None => 0,
        };
        if value < next_value {
            total -= value; // subtractive pair (iv, ix, xl, ...)
        } else {
            total += value;
        }
    }

    // Canonical-form check: the value must encode back to the same string
    let non_canonical = || MalformedOrdinal::NonCanonical(roman.trim().to_string());
    if !(1..=3999).contains(&total) {
        return Err(non_canonical());
    }
    let total = total as u32;
    if encode(total).map_err(|_| non_canonical())? != normalized {
        return Err(non_canonical());
    }
    Ok(total)
}

/// Encode a positive integer as a lowercase roman numeral.
/// Total for 1..=3999; used for re-rendering child ordinals consistently.
pub fn encode(value: u32) -> Result<String, MalformedOrdinal> {
    if value == 0 || value > 3999 {
        return Err(MalformedOrdinal::OutOfRange(value));
    }

    const TABLE: [(u32, &str); 13] = [
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];

    let mut remaining = value;
    let mut out = String::new();
    for (step, digits) in TABLE {
        while remaining >= step {
            out.push_str(digits);
            remaining -= step;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic_numerals() {
        assert_eq!(decode("i"), Ok(1));
        assert_eq!(decode("iv"), Ok(4));
        assert_eq!(decode("ix"), Ok(9));
        assert_eq!(decode("xiv"), Ok(14));
        assert_eq!(decode("xl"), Ok(40));
        assert_eq!(decode("mcmxcix"), Ok(1999));
        assert_eq!(decode("mmmcmxcix"), Ok(3999));
    }

    #[test]
    fn test_decode_is_case_insensitive() {
        assert_eq!(decode("IV"), Ok(4));
        assert_eq!(decode("Xii"), Ok(12));
    }

    #[test]
    fn test_decode_rejects_invalid_characters() {
        assert_eq!(
            decode("izx"),
            Err(MalformedOrdinal::InvalidCharacter('z'))
        );
        assert_eq!(decode(""), Err(MalformedOrdinal::Empty));
        assert_eq!(decode("   "), Err(MalformedOrdinal::Empty));
    }

    #[test]
    fn test_decode_rejects_non_canonical_forms() {
        assert_eq!(
            decode("iiii"),
            Err(MalformedOrdinal::NonCanonical("iiii".to_string()))
        );
        assert_eq!(
            decode("iix"),
            Err(MalformedOrdinal::NonCanonical("iix".to_string()))
        );
        assert_eq!(
            decode("vv"),
            Err(MalformedOrdinal::NonCanonical("vv".to_string()))
        );
    }

    #[test]
    fn test_encode_bounds() {
        assert_eq!(encode(0), Err(MalformedOrdinal::OutOfRange(0)));
        assert_eq!(encode(4000), Err(MalformedOrdinal::OutOfRange(4000)));
        assert_eq!(encode(1).unwrap(), "i");
        assert_eq!(encode(3999).unwrap(), "mmmcmxcix");
    }

    #[test]
    fn test_round_trip_full_range() {
        for n in 1..=3999 {
            let roman = encode(n).unwrap();
            assert_eq!(decode(&roman), Ok(n), "round-trip failed for {n} ({roman})");
        }
    }
}
