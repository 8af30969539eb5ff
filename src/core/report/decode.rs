//! Report document decoding
//!
//! Bytes go through three steps: optional gzip decompression, charset detection, and
//! parsing according to the declared [`ContentShape`]. Any failure is reported as a
//! decode-stage error; nothing is coerced silently.

use crate::core::normalize::shaping::flatten_record;
use crate::domain::{BazaarError, Record, ReportStage, Result};
use flate2::read::GzDecoder;
use serde_json::{Map, Value};
use std::io::Read;

/// How a report document's content is laid out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentShape {
    /// JSON records under a named key, either in one document or one object per line
    Json {
        /// Key holding the record list, e.g. `dataByAsin`
        key: String,
    },
    /// A delimited flat table with a header row
    Delimited {
        /// Field delimiter, usually a tab
        delimiter: u8,
    },
}

impl ContentShape {
    /// JSON records under `key`
    pub fn json(key: impl Into<String>) -> Self {
        ContentShape::Json { key: key.into() }
    }

    /// Tab-delimited table
    pub fn tsv() -> Self {
        ContentShape::Delimited { delimiter: b'\t' }
    }
}

impl Default for ContentShape {
    fn default() -> Self {
        Self::tsv()
    }
}

/// Decode a downloaded document into flat rows
///
/// # Errors
///
/// Returns a decode-stage [`BazaarError::Report`] on bad gzip data, invalid UTF-16, or
/// content that doesn't match `shape`.
pub fn decode_document(bytes: &[u8], compressed: bool, shape: &ContentShape) -> Result<Vec<Record>> {
    let raw = if compressed {
        gunzip(bytes)?
    } else {
        bytes.to_vec()
    };
    let text = decode_text(&raw)?;

    match shape {
        ContentShape::Json { key } => parse_json(&text, key),
        ContentShape::Delimited { delimiter } => parse_delimited(&text, *delimiter),
    }
}

/// Inflate gzip-compressed bytes
pub fn gunzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| decode_error(format!("gzip decompression failed: {e}")))?;
    Ok(out)
}

/// Decode bytes as text
///
/// A UTF-16 byte-order mark selects UTF-16; otherwise UTF-8 is tried first and Latin-1
/// is the fallback, which accepts any byte sequence.
pub fn decode_text(bytes: &[u8]) -> Result<String> {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => Ok(latin1_fallback(rest)),
        _ => Ok(latin1_fallback(bytes)),
    }
}

fn latin1_fallback(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

fn utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(decode_error("UTF-16 document has an odd byte count"));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| decode_error(format!("invalid UTF-16: {e}")))
}

fn parse_json(text: &str, key: &str) -> Result<Vec<Record>> {
    if let Ok(document) = serde_json::from_str::<Value>(text) {
        return records_under_key(&document, key)
            .ok_or_else(|| decode_error(format!("document has no '{key}' list")));
    }

    // Line-delimited: every non-blank line is one object
    let mut rows = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .map_err(|e| decode_error(format!("line {}: {e}", line_no + 1)))?;
        match records_under_key(&value, key) {
            Some(nested) => rows.extend(nested),
            None if value.is_object() => rows.push(flatten_record(&value)),
            None => return Err(decode_error(format!("line {} is not an object", line_no + 1))),
        }
    }
    Ok(rows)
}

fn records_under_key(value: &Value, key: &str) -> Option<Vec<Record>> {
    match value.get(key) {
        Some(Value::Array(items)) => Some(items.iter().map(flatten_record).collect()),
        _ => None,
    }
}

fn parse_delimited(text: &str, delimiter: u8) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| decode_error(format!("unreadable header row: {e}")))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| decode_error(format!("malformed row: {e}")))?;
        let mut row = Map::new();
        for (column, field) in headers.iter().zip(record.iter()) {
            let value = if field.is_empty() {
                Value::Null
            } else {
                Value::String(field.to_string())
            };
            row.insert(column.to_string(), value);
        }
        rows.push(row);
    }
    Ok(rows)
}

fn decode_error(message: impl Into<String>) -> BazaarError {
    BazaarError::report(ReportStage::Decode, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::json;
    use std::io::Write;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_gzip_json_document() {
        let body = json!({
            "dataByAsin": [
                {"parentAsin": "B000000001", "trafficByAsin": {"sessions": 4}},
                {"parentAsin": "B000000002", "trafficByAsin": {"sessions": 9}}
            ]
        });
        let rows = decode_document(
            &gzip(body.to_string().as_bytes()),
            true,
            &ContentShape::json("dataByAsin"),
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["trafficByAsin.sessions"], json!(9));
    }

    #[test]
    fn test_line_delimited_json() {
        let text = "{\"sku\": \"A\"}\n\n{\"sku\": \"B\", \"qty\": 2}\n";
        let rows = decode_document(text.as_bytes(), false, &ContentShape::json("dataByAsin")).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["qty"], json!(2));
    }

    #[test]
    fn test_json_missing_key_is_an_error() {
        let err = decode_document(b"{\"other\": []}", false, &ContentShape::json("dataByAsin"))
            .unwrap_err();
        assert!(matches!(
            err,
            BazaarError::Report {
                stage: ReportStage::Decode,
                ..
            }
        ));
    }

    #[test]
    fn test_tab_delimited_table() {
        let text = "sku\tqty\tnote\nA1\t3\t\nB2\t5\tfragile\n";
        let rows = decode_document(text.as_bytes(), false, &ContentShape::tsv()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["sku"], json!("A1"));
        assert_eq!(rows[0]["note"], Value::Null);
        assert_eq!(rows[1]["note"], json!("fragile"));
    }

    #[test]
    fn test_ragged_table_is_an_error() {
        let text = "a\tb\n1\t2\t3\n";
        assert!(decode_document(text.as_bytes(), false, &ContentShape::tsv()).is_err());
    }

    #[test]
    fn test_bad_gzip_is_a_decode_error() {
        let err = decode_document(b"not gzip", true, &ContentShape::tsv()).unwrap_err();
        assert!(err.to_string().contains("decode stage"));
    }

    #[test]
    fn test_latin1_fallback() {
        let text = decode_text(&[b'c', b'a', 0xE9]).unwrap();
        assert_eq!(text, "caé");
    }

    #[test]
    fn test_utf16_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "sku\tqty".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_text(&bytes).unwrap(), "sku\tqty");
    }

    #[test]
    fn test_utf8_bom_stripped() {
        assert_eq!(decode_text(&[0xEF, 0xBB, 0xBF, b'h', b'i']).unwrap(), "hi");
    }
}
