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

//! Parsing of storage account and container endpoint URLs
//!
//! Endpoints are accepted with or without a scheme, `https` is assumed when
//! none is given. Any shared access signature carried in the query string is
//! extracted into a [`SasToken`] so it can be reused for authorization.
//!
//! ```
//! # use blob_batch::endpoint::parse_container_url;
//! let parsed = parse_container_url(
//!     "myaccount.blob.core.windows.net/mycontainer?sv=2021-10-04&sig=abc%3D",
//!     "mycontainer",
//! )
//! .unwrap();
//!
//! assert_eq!(parsed.scheme(), "https");
//! assert_eq!(parsed.host(), "myaccount.blob.core.windows.net");
//! assert_eq!(parsed.sas_token().unwrap().signature(), "abc=");
//! ```

use crate::util::{encode_path, encode_query_value};
use crate::{Error, Result};
use itertools::Itertools;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use tracing::trace;
use url::Url;

/// Query parameters which make up a shared access signature
///
/// <https://learn.microsoft.com/en-us/rest/api/storageservices/create-service-sas>
const SAS_QUERY_PARAMETERS: &[&str] = &[
    "sv", "ss", "srt", "sp", "se", "st", "sip", "spr", "sr", "si", "sig", "rscc", "rscd", "rsce",
    "rscl", "rsct", "spk", "srk", "epk", "erk", "skoid", "sktid", "skt", "ske", "sks", "skv",
    "ses", "skdutid", "sduoid", "saoid", "suoid", "scid", "sdd",
];

/// The signature component of a shared access signature
const SAS_SIGNATURE: &str = "sig";

/// A shared access signature extracted from an endpoint query string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SasToken {
    /// Decoded key value pairs, in the order they appeared
    pairs: Vec<(String, String)>,
}

impl SasToken {
    /// The decoded value of the `sig` parameter
    pub fn signature(&self) -> &str {
        self.get(SAS_SIGNATURE).unwrap_or_default()
    }

    /// Returns the decoded value of `key` if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The decoded query pairs making up this token
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

impl Display for SasToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let encoded = self
            .pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", encode_query_value(v)))
            .join("&");
        f.write_str(&encoded)
    }
}

/// A validated account or container endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    url: Url,
    sas_token: Option<SasToken>,
    snapshot: Option<String>,
}

impl ParsedUrl {
    /// The full parsed URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URL scheme, `https` unless `http` was given explicitly
    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// The host, never empty
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// The explicit port, if any
    pub fn port(&self) -> Option<u16> {
        self.url.port()
    }

    /// The URL path
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// The raw query string, without the leading `?`
    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    /// The shared access signature found in the query string
    pub fn sas_token(&self) -> Option<&SasToken> {
        self.sas_token.as_ref()
    }

    /// The `snapshot` (or `sharesnapshot`) query value
    pub fn snapshot(&self) -> Option<&str> {
        self.snapshot.as_deref()
    }

    /// Splits this into the parsed URL and the SAS token
    pub fn into_parts(self) -> (Url, Option<SasToken>) {
        (self.url, self.sas_token)
    }
}

/// Validates a storage account URL and extracts its SAS token
///
/// The scheme defaults to `https` when the input does not start with `http`,
/// and trailing slashes are removed. Fails if the result has no host.
pub fn parse_account_url(account_url: &str) -> Result<ParsedUrl> {
    let url = with_default_scheme(account_url);
    parse_endpoint(&url)
}

/// As [`parse_account_url`] for input that may not be valid UTF-8
pub fn parse_account_url_bytes(account_url: &[u8]) -> Result<ParsedUrl> {
    let url = std::str::from_utf8(account_url).map_err(|_| Error::UrlNotString {
        kind: "Account",
    })?;
    parse_account_url(url)
}

/// Validates a container URL and extracts its SAS token
///
/// Fails if `container_name` is empty, otherwise behaves as
/// [`parse_account_url`].
pub fn parse_container_url(container_url: &str, container_name: &str) -> Result<ParsedUrl> {
    let url = with_default_scheme(container_url);
    if container_name.is_empty() {
        return Err(Error::MissingContainerName);
    }
    parse_endpoint(&url)
}

/// As [`parse_container_url`] for input that may not be valid UTF-8
pub fn parse_container_url_bytes(container_url: &[u8], container_name: &str) -> Result<ParsedUrl> {
    let url = std::str::from_utf8(container_url).map_err(|_| Error::UrlNotString {
        kind: "Container",
    })?;
    parse_container_url(url, container_name)
}

/// Formats the URL of `container_name` against a location-mode hostname
///
/// `query_str` is appended verbatim and should start with `?` if non-empty
pub fn format_container_url(
    container_name: &str,
    hostname: &str,
    scheme: &str,
    query_str: &str,
) -> String {
    format!(
        "{scheme}://{hostname}/{}{query_str}",
        encode_path(container_name)
    )
}

/// Parses a query string, returning the snapshot and SAS token it carries
///
/// Keys and values are percent-decoded, only the first occurrence of a key is
/// kept and pairs with an empty value are ignored. A SAS token is returned
/// only if the query contains a signature.
pub fn parse_query(query: &str) -> (Option<String>, Option<SasToken>) {
    let query = query.trim_start_matches('?');
    let mut parsed: Vec<(String, String)> = Vec::new();
    for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
        if v.is_empty() || parsed.iter().any(|(existing, _)| *existing == k) {
            continue;
        }
        parsed.push((k.into_owned(), v.into_owned()));
    }

    let snapshot = ["snapshot", "sharesnapshot"].iter().find_map(|key| {
        parsed
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    });

    let pairs: Vec<_> = parsed
        .into_iter()
        .filter(|(k, _)| SAS_QUERY_PARAMETERS.contains(&k.as_str()))
        .collect();

    let sas_token = pairs
        .iter()
        .any(|(k, _)| k == SAS_SIGNATURE)
        .then(|| SasToken { pairs });

    (snapshot, sas_token)
}

fn with_default_scheme(url: &str) -> Cow<'_, str> {
    match url.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("http") => Cow::Borrowed(url),
        _ => Cow::Owned(format!("https://{url}")),
    }
}

fn parse_endpoint(url: &str) -> Result<ParsedUrl> {
    let trimmed = url.trim_end_matches('/');
    let parsed = Url::parse(trimmed).map_err(|source| match source {
        url::ParseError::EmptyHost => Error::InvalidUrl { url: url.into() },
        source => Error::UnableToParseUrl {
            url: url.into(),
            source,
        },
    })?;

    match parsed.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(Error::InvalidUrl { url: url.into() }),
    }

    let (snapshot, sas_token) = parse_query(parsed.query().unwrap_or_default());
    trace!(
        url = %parsed,
        has_sas = sas_token.is_some(),
        "parsed storage endpoint"
    );

    Ok(ParsedUrl {
        url: parsed,
        sas_token,
        snapshot,
    })
}
