//! Row codec for `treasure.dat`.
//!
//! A row is six whitespace-separated tokens:
//! `id username longitude latitude clue value`. Coordinates are written with
//! six fixed decimals.
//!
//! Decoding is lenient about numbers: a numeric token is read up
//! to the end of its longest numeric prefix, and a token with no numeric
//! prefix decodes as zero. A row is rejected only when it does not have
//! exactly six tokens. Hand-edited or legacy files therefore keep loading,
//! and callers that need strict input (the CLI) validate before encoding.

use crate::model::Treasure;

pub const FIELD_COUNT: usize = 6;

/// Render one row, including the trailing newline.
pub fn encode(t: &Treasure) -> String {
    format!(
        "{} {} {:.6} {:.6} {} {}\n",
        t.id, t.username, t.longitude, t.latitude, t.clue, t.value
    )
}

/// Parse one row. Returns `None` unless the line has exactly six tokens.
pub fn decode(line: &str) -> Option<Treasure> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != FIELD_COUNT {
        return None;
    }
    Some(Treasure {
        id: tokens[0].to_string(),
        username: tokens[1].to_string(),
        longitude: lenient_f64(tokens[2]),
        latitude: lenient_f64(tokens[3]),
        clue: tokens[4].to_string(),
        value: lenient_i64(tokens[5]),
    })
}

/// Decode every well-formed row of a file's contents, in file order.
pub fn decode_all(content: &str) -> impl Iterator<Item = Treasure> + '_ {
    content.lines().filter_map(decode)
}

/// Longest leading float prefix, or 0.0.
pub fn lenient_f64(token: &str) -> f64 {
    if let Ok(v) = token.parse::<f64>()
        && v.is_finite()
    {
        return v;
    }
    let end = numeric_prefix_len(token, true);
    (1..=end)
        .rev()
        .filter(|&i| token.is_char_boundary(i))
        .find_map(|i| token[..i].parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Longest leading integer prefix, or 0. Saturates instead of overflowing.
pub fn lenient_i64(token: &str) -> i64 {
    if let Ok(v) = token.parse::<i64>() {
        return v;
    }
    let end = numeric_prefix_len(token, false);
    let prefix = &token[..end];
    let digits = prefix.trim_start_matches(['+', '-']);
    if digits.is_empty() {
        return 0;
    }
    prefix.parse::<i64>().unwrap_or(if prefix.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Byte length of the leading `[+-]?digits[.digits][e[+-]digits]` run.
fn numeric_prefix_len(token: &str, allow_fraction: bool) -> usize {
    let bytes = token.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if !allow_fraction {
        return i;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let digits_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > digits_start {
            i = j;
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Treasure {
        Treasure::new("T1", "alice", 12.5, -45.25, "under_the_oak", 100)
    }

    #[test]
    fn encode_uses_fixed_precision() {
        assert_eq!(
            encode(&sample()),
            "T1 alice 12.500000 -45.250000 under_the_oak 100\n"
        );
    }

    #[test]
    fn decode_inverts_encode() {
        let cases = [
            sample(),
            Treasure::new("X", "b", 0.0, 0.0, "c", -7),
            Treasure::new("123456789", "long_name", -179.123456, 89.654321, "x", i64::MAX),
        ];
        for t in cases {
            assert_eq!(decode(&encode(&t)), Some(t));
        }
    }

    #[test]
    fn decode_requires_exactly_six_tokens() {
        assert!(decode("").is_none());
        assert!(decode("T1 alice 1.0 2.0 clue").is_none());
        assert!(decode("T1 alice 1.0 2.0 clue 5 extra").is_none());
        assert!(decode("  T1\talice  1.0 2.0   clue 5  ").is_some());
    }

    #[test]
    fn numeric_tokens_decode_leniently() {
        let t = decode("T1 alice abc 3.5xyz clue 12points").unwrap();
        assert_eq!(t.longitude, 0.0);
        assert_eq!(t.latitude, 3.5);
        assert_eq!(t.value, 12);

        let t = decode("T2 bob -1e2 .5 clue nope").unwrap();
        assert_eq!(t.longitude, -100.0);
        assert_eq!(t.latitude, 0.5);
        assert_eq!(t.value, 0);
    }

    #[test]
    fn lenient_helpers_edge_cases() {
        assert_eq!(lenient_i64("-"), 0);
        assert_eq!(lenient_i64("+42"), 42);
        assert_eq!(lenient_i64("99999999999999999999"), i64::MAX);
        assert_eq!(lenient_i64("-99999999999999999999x"), i64::MIN);
        assert_eq!(lenient_f64("1e"), 1.0);
        assert_eq!(lenient_f64("inf"), 0.0);
        assert_eq!(lenient_f64("2.5.1"), 2.5);
    }

    #[test]
    fn decode_all_skips_garbage_rows() {
        let content = "T1 a 1 2 c 3\nbroken line\n\nT2 b 1 2 c 4\n";
        let ids: Vec<String> = decode_all(content).map(|t| t.id).collect();
        assert_eq!(ids, vec!["T1", "T2"]);
    }
}
