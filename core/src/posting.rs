use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Number of tab-separated fields in an ingestion record.
pub const TSV_FIELDS: usize = 8;

/// One (word, document) entry of the inverted index with its precomputed statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub word: String,
    pub url: String,
    /// Term frequency divided by the most frequent term of the document.
    pub maximum_tf: f64,
    /// Term frequency divided by the Euclidean length of the document's term vector.
    pub euclidean_tf: f64,
    pub word_count: u32,
    pub link_count: u32,
    pub meta_tag_count: u32,
    pub header_count: u32,
}

impl Posting {
    pub fn new(word: impl Into<String>, url: impl Into<String>, maximum_tf: f64, euclidean_tf: f64) -> Self {
        Self {
            word: word.into(),
            url: url.into(),
            maximum_tf,
            euclidean_tf,
            word_count: 0,
            link_count: 0,
            meta_tag_count: 0,
            header_count: 0,
        }
    }

    /// Parse `word, url, max tf, euclidean tf, words, links, meta tags, headers`.
    pub fn from_tsv_line(line: &str) -> Result<Self, ParseError> {
        let parts: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if parts.len() != TSV_FIELDS {
            return Err(ParseError::FieldCount { expected: TSV_FIELDS, found: parts.len() });
        }
        if parts[0].is_empty() {
            return Err(ParseError::EmptyField("word"));
        }
        if parts[1].is_empty() {
            return Err(ParseError::EmptyField("url"));
        }
        for (field, value) in [("word", parts[0]), ("url", parts[1])] {
            if value.contains('\0') {
                return Err(ParseError::NulByte(field));
            }
        }
        Ok(Self {
            word: parts[0].to_string(),
            url: parts[1].to_string(),
            maximum_tf: parse_weight("maximum_tf", parts[2])?,
            euclidean_tf: parse_weight("euclidean_tf", parts[3])?,
            word_count: parse_field("word_count", parts[4])?,
            link_count: parse_field("link_count", parts[5])?,
            meta_tag_count: parse_field("meta_tag_count", parts[6])?,
            header_count: parse_field("header_count", parts[7])?,
        })
    }
}

fn parse_field<T: FromStr>(field: &'static str, raw: &str) -> Result<T, ParseError> {
    raw.trim()
        .parse()
        .map_err(|_| ParseError::InvalidNumber { field, value: raw.to_string() })
}

/// Like [`parse_field`] but rejects `NaN` and infinities.
fn parse_weight(field: &'static str, raw: &str) -> Result<f64, ParseError> {
    let value: f64 = parse_field(field, raw)?;
    if !value.is_finite() {
        return Err(ParseError::InvalidNumber { field, value: raw.to_string() });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_record() {
        let p = Posting::from_tsv_line("cat\thttp://a.example\t1.0\t0.5\t120\t7\t3\t2").unwrap();
        assert_eq!(p.word, "cat");
        assert_eq!(p.url, "http://a.example");
        assert_eq!(p.maximum_tf, 1.0);
        assert_eq!(p.euclidean_tf, 0.5);
        assert_eq!((p.word_count, p.link_count, p.meta_tag_count, p.header_count), (120, 7, 3, 2));
    }

    #[test]
    fn tolerates_windows_line_endings() {
        let p = Posting::from_tsv_line("dog\tu\t0.2\t0.1\t1\t0\t0\t0\r\n").unwrap();
        assert_eq!(p.header_count, 0);
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = Posting::from_tsv_line("cat\tu\t1.0").unwrap_err();
        assert_eq!(err, ParseError::FieldCount { expected: 8, found: 3 });
    }

    #[test]
    fn rejects_non_numeric_fields() {
        let err = Posting::from_tsv_line("cat\tu\tone\t0.5\t1\t1\t1\t1").unwrap_err();
        assert_eq!(err, ParseError::InvalidNumber { field: "maximum_tf", value: "one".into() });
        let err = Posting::from_tsv_line("cat\tu\t1.0\tNaN\t1\t1\t1\t1").unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { field: "euclidean_tf", .. }));
        let err = Posting::from_tsv_line("cat\tu\t1.0\t0.5\t-4\t1\t1\t1").unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { field: "word_count", .. }));
    }

    #[test]
    fn rejects_nul_in_keys() {
        let err = Posting::from_tsv_line("a\0b\tu\t1.0\t0.5\t1\t1\t1\t1").unwrap_err();
        assert_eq!(err, ParseError::NulByte("word"));
        let err = Posting::from_tsv_line("a\tu\0v\t1.0\t0.5\t1\t1\t1\t1").unwrap_err();
        assert_eq!(err, ParseError::NulByte("url"));
    }

    #[test]
    fn rejects_empty_key() {
        let err = Posting::from_tsv_line("\tu\t1.0\t0.5\t1\t1\t1\t1").unwrap_err();
        assert_eq!(err, ParseError::EmptyField("word"));
    }
}
