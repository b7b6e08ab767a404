// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Minimal `multipart/form-data` reader (RFC 7578).
//
// Browsers upload the photo as a form field called `file`. Only what that
// needs is handled: part headers, `Content-Disposition` name/filename and the
// part's own `Content-Type`. No nested multipart, no transfer encodings.

use thiserror::Error;

use crate::http::find_subsequence;

/// Form field carrying the uploaded image.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultipartError {
    #[error("multipart body has no boundary parameter")]
    MissingBoundary,

    #[error("malformed multipart body: {0}")]
    Malformed(&'static str),
}

/// One part of a form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPart {
    pub name: Option<String>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Pull the `boundary` parameter out of a `multipart/form-data` content type.
///
/// Returns `None` when the content type is not multipart at all, and
/// `Some(Err(..))` when it is but the boundary is missing.
pub fn boundary_from_content_type(content_type: &str) -> Option<Result<String, MultipartError>> {
    let mut params = content_type.split(';');
    let essence = params.next()?.trim();
    if !essence.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }

    let boundary = params
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty());

    Some(boundary.ok_or(MultipartError::MissingBoundary))
}

/// Split a multipart body into its parts, in order.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<Vec<FormPart>, MultipartError> {
    let delimiter = format!("--{boundary}").into_bytes();
    let separator = format!("\r\n--{boundary}").into_bytes();

    let first = find_subsequence(body, &delimiter)
        .ok_or(MultipartError::Malformed("opening boundary not found"))?;
    let mut cursor = first + delimiter.len();
    let mut parts = Vec::new();

    loop {
        if body[cursor..].starts_with(b"--") {
            return Ok(parts);
        }
        // RFC 2046 transport padding: linear whitespace may trail the boundary.
        cursor += body[cursor..]
            .iter()
            .take_while(|b| matches!(b, b' ' | b'\t'))
            .count();
        if !body[cursor..].starts_with(b"\r\n") {
            return Err(MultipartError::Malformed("boundary not followed by CRLF"));
        }
        cursor += 2;

        let header_len = find_subsequence(&body[cursor..], b"\r\n\r\n")
            .ok_or(MultipartError::Malformed("part headers not terminated"))?;
        let headers = String::from_utf8_lossy(&body[cursor..cursor + header_len]);
        let data_start = cursor + header_len + 4;

        let data_len = find_subsequence(&body[data_start..], &separator)
            .ok_or(MultipartError::Malformed("closing boundary not found"))?;

        let mut part = FormPart {
            data: body[data_start..data_start + data_len].to_vec(),
            ..FormPart::default()
        };
        for line in headers.split("\r\n") {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            if name.trim().eq_ignore_ascii_case("content-disposition") {
                part.name = disposition_param(value, "name");
                part.filename = disposition_param(value, "filename");
            } else if name.trim().eq_ignore_ascii_case("content-type") {
                part.content_type = Some(value.to_string());
            }
        }
        parts.push(part);

        cursor = data_start + data_len + separator.len();
    }
}

/// Read a quoted or bare parameter from a `Content-Disposition` value.
fn disposition_param(value: &str, key: &str) -> Option<String> {
    value
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case(key))
        .map(|(_, v)| v.trim().trim_matches('"').to_string())
}

/// The part submitted under `field`, if any.
pub fn find_field(parts: Vec<FormPart>, field: &str) -> Option<FormPart> {
    parts
        .into_iter()
        .find(|part| part.name.as_deref() == Some(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(boundary: &str, parts: &[(&str, Option<&str>, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, filename, content_type, data) in parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            let mut disposition = format!("Content-Disposition: form-data; name=\"{name}\"");
            if let Some(filename) = filename {
                disposition.push_str(&format!("; filename=\"{filename}\""));
            }
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(b"\r\n");
            if let Some(content_type) = content_type {
                body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }

    #[test]
    fn boundary_is_read_from_content_type() {
        let ct = "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxk";
        assert_eq!(
            boundary_from_content_type(ct),
            Some(Ok("----WebKitFormBoundary7MA4YWxk".to_string()))
        );
        assert_eq!(
            boundary_from_content_type("Multipart/Form-Data; boundary=\"abc\""),
            Some(Ok("abc".to_string()))
        );
    }

    #[test]
    fn non_multipart_has_no_boundary() {
        assert_eq!(boundary_from_content_type("image/png"), None);
        assert_eq!(
            boundary_from_content_type("multipart/form-data"),
            Some(Err(MultipartError::MissingBoundary))
        );
    }

    #[test]
    fn file_part_is_extracted_with_metadata() {
        let png = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
        let body = form(
            "XyZ",
            &[
                ("note", None, None, &b"hello"[..]),
                ("file", Some("label.png"), Some("image/png"), &png[..]),
            ],
        );

        let parts = parse_multipart(&body, "XyZ").unwrap();
        assert_eq!(parts.len(), 2);

        let file = find_field(parts, FILE_FIELD).unwrap();
        assert_eq!(file.filename.as_deref(), Some("label.png"));
        assert_eq!(file.content_type.as_deref(), Some("image/png"));
        // Embedded CRLFs inside the payload survive.
        assert_eq!(file.data, png);
    }

    #[test]
    fn missing_file_field_is_none() {
        let body = form("b", &[("other", None, None, &b"x"[..])]);
        let parts = parse_multipart(&body, "b").unwrap();
        assert!(find_field(parts, FILE_FIELD).is_none());
    }

    #[test]
    fn whitespace_after_boundary_line_is_tolerated() {
        let body = b"--b \t\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\n\
\r\n\
PNGDATA\r\n\
--b  \r\n\
Content-Disposition: form-data; name=\"note\"\r\n\
\r\n\
hi\r\n\
--b--\r\n";

        let parts = parse_multipart(body, "b").unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].data, b"PNGDATA");
        assert_eq!(parts[1].name.as_deref(), Some("note"));

        // Anything other than blanks before the CRLF is still rejected.
        let junk = b"--b x\r\n\r\n\r\n--b--";
        assert_eq!(
            parse_multipart(junk, "b"),
            Err(MultipartError::Malformed("boundary not followed by CRLF"))
        );
    }

    #[test]
    fn truncated_body_is_malformed() {
        let mut body = form("b", &[("file", Some("a.jpg"), Some("image/jpeg"), &b"\xff\xd8"[..])]);
        body.truncate(body.len() - 12);
        assert!(matches!(
            parse_multipart(&body, "b"),
            Err(MultipartError::Malformed(_))
        ));
        assert!(parse_multipart(b"no boundaries here", "b").is_err());
    }
}
