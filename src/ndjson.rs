//! Incremental NDJSON decoding over raw byte chunks.
//!
//! The review stream is newline-delimited JSON: each line is either an
//! array of reviews or a terminal `{"error": ...}` sentinel. Transport
//! chunk boundaries are arbitrary, so the decoder buffers bytes and only
//! decodes complete lines; the unterminated tail is carried over to the
//! next chunk.

use bytes::BytesMut;
use serde::Deserialize;

use crate::error::QueryError;
use crate::types::ReviewItem;

/// One decoded record from the review stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A batch of reviews, in stream order.
    Batch(Vec<ReviewItem>),
    /// Terminal server-reported failure.
    ServerError(String),
}

/// Wire shape of a single stream line.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLine {
    Batch(Vec<ReviewItem>),
    Sentinel { error: String },
}

/// Incremental line decoder; owns the carry-over buffer between chunks.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buf: BytesMut,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one transport chunk and decode every complete line in it.
    ///
    /// Records come back in the exact order their lines appeared in the
    /// byte stream. The buffer holds raw bytes, so a chunk boundary that
    /// splits a multi-byte UTF-8 sequence cannot corrupt a line.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Record>, QueryError> {
        self.buf.extend_from_slice(chunk);
        let mut records = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.split_to(pos + 1);
            records.push(decode_line(&line[..line.len() - 1])?);
        }
        Ok(records)
    }

    /// Decode whatever is left in the buffer after end of data.
    ///
    /// A server that omits the newline after its last record still gets
    /// that record decoded here. Whitespace-only residue is discarded.
    pub fn finish(&mut self) -> Result<Option<Record>, QueryError> {
        let rest = self.buf.split();
        if rest.trim_ascii().is_empty() {
            return Ok(None);
        }
        decode_line(&rest).map(Some)
    }
}

fn decode_line(line: &[u8]) -> Result<Record, QueryError> {
    let text = std::str::from_utf8(line)
        .map_err(|e| QueryError::protocol(format!("invalid UTF-8 in stream: {}", e)))?;
    let raw: RawLine = serde_json::from_str(text)
        .map_err(|e| QueryError::protocol(format!("unrecognized stream line: {}", e)))?;
    Ok(match raw {
        RawLine::Batch(items) => Record::Batch(items),
        RawLine::Sentinel { error } => Record::ServerError(error),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_line(entries: &[(f64, &str, f64)]) -> String {
        let items: Vec<String> = entries
            .iter()
            .map(|(ts, author, rating)| {
                format!(
                    r#"{{"timestamp":{},"author":"{}","content":"","rating":{}}}"#,
                    ts, author, rating
                )
            })
            .collect();
        format!("[{}]\n", items.join(","))
    }

    fn unwrap_batch(record: Record) -> Vec<ReviewItem> {
        match record {
            Record::Batch(items) => items,
            other => panic!("expected batch, got {:?}", other),
        }
    }

    #[test]
    fn test_single_chunk_multiple_lines() {
        let mut decoder = NdjsonDecoder::new();
        let data = format!(
            "{}{}",
            batch_line(&[(1000.0, "a", 5.0)]),
            batch_line(&[(2000.0, "b", 3.0)])
        );

        let records = decoder.push(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(unwrap_batch(records[0].clone())[0].author, "a");
        assert_eq!(unwrap_batch(records[1].clone())[0].author, "b");
        assert_eq!(decoder.finish().unwrap(), None);
    }

    #[test]
    fn test_line_split_across_chunks() {
        let mut decoder = NdjsonDecoder::new();
        let line = batch_line(&[(1000.0, "a", 5.0), (2000.0, "b", 3.0)]);
        let (head, tail) = line.split_at(line.len() / 2);

        assert!(decoder.push(head.as_bytes()).unwrap().is_empty());
        let records = decoder.push(tail.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(unwrap_batch(records[0].clone()).len(), 2);
    }

    #[test]
    fn test_multibyte_utf8_split_across_chunks() {
        let mut decoder = NdjsonDecoder::new();
        let line = r#"[{"timestamp":1.0,"author":"café","content":"crème","rating":4.0}]"#;
        let bytes = format!("{}\n", line).into_bytes();
        // Split inside the 'é' sequence.
        let split = bytes.iter().position(|b| *b >= 0x80).unwrap() + 1;

        assert!(decoder.push(&bytes[..split]).unwrap().is_empty());
        let records = decoder.push(&bytes[split..]).unwrap();
        let items = unwrap_batch(records[0].clone());
        assert_eq!(items[0].author, "café");
        assert_eq!(items[0].content, "crème");
    }

    #[test]
    fn test_error_sentinel() {
        let mut decoder = NdjsonDecoder::new();
        let records = decoder.push(b"{\"error\":\"scrape failed\"}\n").unwrap();
        assert_eq!(
            records,
            vec![Record::ServerError("scrape failed".to_string())]
        );
    }

    #[test]
    fn test_invalid_json_is_protocol_error() {
        let mut decoder = NdjsonDecoder::new();
        let err = decoder.push(b"not json\n").unwrap_err();
        assert!(matches!(err, QueryError::Protocol { .. }));
    }

    #[test]
    fn test_unexpected_shape_is_protocol_error() {
        let mut decoder = NdjsonDecoder::new();
        let err = decoder.push(b"{\"unexpected\":1}\n").unwrap_err();
        assert!(matches!(err, QueryError::Protocol { .. }));
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = NdjsonDecoder::new();
        let line = batch_line(&[(1000.0, "a", 5.0)]);
        // No trailing newline.
        assert!(decoder.push(line.trim_end().as_bytes()).unwrap().is_empty());

        let record = decoder.finish().unwrap().expect("trailing record");
        assert_eq!(unwrap_batch(record)[0].timestamp, 1000.0);
        assert_eq!(decoder.finish().unwrap(), None);
    }

    #[test]
    fn test_finish_ignores_whitespace_residue() {
        let mut decoder = NdjsonDecoder::new();
        decoder.push(b"  ").unwrap();
        assert_eq!(decoder.finish().unwrap(), None);
    }

    #[test]
    fn test_empty_batch_line() {
        let mut decoder = NdjsonDecoder::new();
        let records = decoder.push(b"[]\n").unwrap();
        assert_eq!(records, vec![Record::Batch(vec![])]);
    }
}
