//! `Content-Range` / `Range` header formatting and parsing.

use crate::error::UploadError;

/// Format the `Content-Range` header for a chunk covering `[start, start+len)`.
///
/// `total` is the known total length, or `None` for the unknown-size regime. The
/// zero-length special case (`len == 0`, `total == Some(0)`) emits `bytes */0`.
pub fn format_chunk_range(start: u64, len: u64, total: Option<u64>) -> String {
    if len == 0 && total == Some(0) {
        return "bytes */0".to_string();
    }
    let end = start + len - 1;
    match total {
        Some(t) => format!("bytes {}-{}/{}", start, end, t),
        None => format!("bytes {}-{}/*", start, end),
    }
}

/// Format the `Content-Range` header for a status-query request.
pub fn format_status_query_range(total: Option<u64>) -> String {
    match total {
        Some(t) => format!("bytes */{}", t),
        None => "bytes */*".to_string(),
    }
}

/// Parse a 308 response's `Range: bytes 0-N` header into the next byte index (`N + 1`).
///
/// Tolerates leading/trailing whitespace. Any other shape is a protocol violation.
pub fn parse_range_header(value: &str) -> Result<u64, UploadError> {
    let value = value.trim();
    let rest = value.strip_prefix("bytes ").ok_or_else(|| {
        UploadError::ProtocolViolation(format!("malformed Range header: {:?}", value))
    })?;
    let (_start, end) = rest.split_once('-').ok_or_else(|| {
        UploadError::ProtocolViolation(format!("malformed Range header: {:?}", value))
    })?;
    let end: u64 = end.trim().parse().map_err(|_| {
        UploadError::ProtocolViolation(format!("malformed Range header: {:?}", value))
    })?;
    Ok(end + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_known_total() {
        assert_eq!(format_chunk_range(0, 453, Some(453)), "bytes 0-452/453");
        assert_eq!(format_chunk_range(300, 100, Some(453)), "bytes 300-399/453");
    }

    #[test]
    fn formats_unknown_total() {
        assert_eq!(format_chunk_range(0, 100, None), "bytes 0-99/*");
    }

    #[test]
    fn formats_empty_payload_special_case() {
        assert_eq!(format_chunk_range(0, 0, Some(0)), "bytes */0");
    }

    #[test]
    fn formats_status_query() {
        assert_eq!(format_status_query_range(Some(453)), "bytes */453");
        assert_eq!(format_status_query_range(None), "bytes */*");
    }

    #[test]
    fn parses_range_header() {
        assert_eq!(parse_range_header("bytes 0-299").unwrap(), 300);
        assert_eq!(parse_range_header("  bytes 0-299  ").unwrap(), 300);
    }

    #[test]
    fn rejects_malformed_range_header() {
        assert!(parse_range_header("0-299").is_err());
        assert!(parse_range_header("bytes abc").is_err());
        assert!(parse_range_header("bytes 0-xyz").is_err());
    }
}
