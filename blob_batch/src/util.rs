// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Encoding and formatting helpers shared by the URL parser and batch builders

use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

pub(crate) static RFC1123_FMT: &str = "%a, %d %h %Y %T GMT";

// Do not encode any of the unreserved characters that RFC 3986 defines:
// A-Z, a-z, 0-9, hyphen ( - ), underscore ( _ ), period ( . ), and tilde ( ~ ).
pub(crate) const STRICT_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// As [`STRICT_ENCODE_SET`] but keeping the path delimiter
pub(crate) const STRICT_PATH_ENCODE_SET: AsciiSet = STRICT_ENCODE_SET.remove(b'/');

/// Percent-encode a query component, leaving only unreserved characters
pub(crate) fn encode_query_value(s: &str) -> String {
    utf8_percent_encode(s, &STRICT_ENCODE_SET).to_string()
}

/// Percent-encode a path, preserving `/`
pub(crate) fn encode_path(s: &str) -> String {
    utf8_percent_encode(s, &STRICT_PATH_ENCODE_SET).to_string()
}

/// Returns `/{container}/{blob}{query_str}` with both names percent-encoded
pub(crate) fn blob_path(container: &str, blob: &str, query_str: &str) -> String {
    format!(
        "/{}/{}{}",
        encode_path(container),
        encode_path(blob),
        query_str
    )
}

/// Format a timestamp as an HTTP date, e.g. `Fri, 01 Jan 2021 00:00:00 GMT`
pub(crate) fn format_rfc1123(date: &DateTime<Utc>) -> String {
    date.format(RFC1123_FMT).to_string()
}

/// Parse an HTTP date, falling back to RFC 3339
pub(crate) fn parse_http_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn encodes_path() {
        assert_eq!(encode_path("dir/file name.txt"), "dir/file%20name.txt");
        assert_eq!(encode_path("a~b_c-d.e"), "a~b_c-d.e");
        assert_eq!(encode_path("50%+?#"), "50%25%2B%3F%23");
        assert_eq!(encode_path("ünï"), "%C3%BCn%C3%AF");
    }

    #[test]
    fn encodes_query_value() {
        assert_eq!(encode_query_value("a/b:c"), "a%2Fb%3Ac");
        assert_eq!(encode_query_value("abc=="), "abc%3D%3D");
    }

    #[test]
    fn formats_blob_path() {
        assert_eq!(
            blob_path("my container", "dir/blob~1", "?sv=1"),
            "/my%20container/dir/blob~1?sv=1"
        );
        assert_eq!(blob_path("c", "b", ""), "/c/b");
    }

    #[test]
    fn http_dates() {
        let date = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let formatted = format_rfc1123(&date);
        assert_eq!(formatted, "Fri, 01 Jan 2021 00:00:00 GMT");
        assert_eq!(parse_http_date(&formatted), Some(date));
        assert_eq!(parse_http_date("2021-01-01T00:00:00Z"), Some(date));
        assert_eq!(parse_http_date("yesterday"), None);
    }
}
