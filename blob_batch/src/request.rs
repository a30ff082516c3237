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

//! The output of the batch builders

use crate::util::encode_query_value;
use crate::{Error, Result};
use http::{HeaderMap, Method};
use itertools::Itertools;

/// A single operation of a blob batch
///
/// <https://learn.microsoft.com/en-us/rest/api/storageservices/blob-batch>
#[derive(Debug, Clone)]
pub struct SubRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
}

impl SubRequest {
    /// Create a new [`SubRequest`] without query parameters
    pub fn new(method: Method, path: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
            query: Vec::new(),
        }
    }

    /// The HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request path, including the container query string it was built with
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The headers of this request
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the header `name` as a string, if present and visible ASCII
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The attached query parameters, unencoded
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Returns the attached query parameter `name`
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attach query parameters, replacing any previously attached with the same name
    pub fn format_parameters<I, K, V>(&mut self, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in params {
            let (k, v) = (k.into(), v.into());
            match self.query.iter_mut().find(|(existing, _)| *existing == k) {
                Some(slot) => slot.1 = v,
                None => self.query.push((k, v)),
            }
        }
    }

    /// The request target written into the batch body
    ///
    /// Attached parameters come first, followed by those already in the path.
    /// Where both define a key, the value from the path wins.
    pub fn url(&self) -> String {
        let (base, existing) = match self.path.split_once('?') {
            Some((base, query)) => (base, query),
            None => (self.path.as_str(), ""),
        };

        let existing: Vec<(&str, &str)> = existing
            .split('&')
            .filter(|p| !p.is_empty())
            .map(|p| p.split_once('=').unwrap_or((p, "")))
            .collect();

        let attached = self.query.iter().map(|(k, v)| {
            match existing.iter().find(|(e, _)| e == k) {
                Some((_, raw)) => format!("{k}={raw}"),
                None => format!("{k}={}", encode_query_value(v)),
            }
        });

        let remaining = existing
            .iter()
            .filter(|(e, _)| !self.query.iter().any(|(k, _)| k == e))
            .map(|(k, v)| format!("{k}={v}"));

        let query = attached.chain(remaining).join("&");
        match query.is_empty() {
            true => base.to_string(),
            false => format!("{base}?{query}"),
        }
    }

    /// Convert into an [`http::Request`] addressed by [`Self::url`]
    pub fn into_http(self) -> Result<http::Request<()>> {
        let mut builder = http::Request::builder()
            .method(self.method.clone())
            .uri(self.url());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers);
        }
        builder
            .body(())
            .map_err(|source| Error::InvalidRequest { source })
    }
}

/// Options handed on to the layer that sends the batch
///
/// <https://learn.microsoft.com/en-us/rest/api/storageservices/blob-batch#request>
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Fail the whole batch if any sub-request fails
    pub raise_on_any_failure: bool,
    /// The container query string with `?` replaced by `&`
    pub sas: String,
    /// `&timeout=N`, or empty when no timeout applies
    pub timeout: String,
    /// The container name
    pub path: String,
    /// The resource type prefix of the batch query
    pub restype: String,
}

impl BatchOptions {
    pub(crate) fn new(
        query_str: &str,
        container_name: &str,
        timeout: Option<u32>,
        raise_on_any_failure: bool,
    ) -> Self {
        Self {
            raise_on_any_failure,
            sas: query_str.replace('?', "&"),
            timeout: match timeout {
                Some(t) if t > 0 => format!("&timeout={t}"),
                _ => String::new(),
            },
            path: container_name.to_string(),
            restype: "restype=container&".to_string(),
        }
    }

    /// The URL the batch request itself is sent to
    pub fn batch_url(&self, scheme: &str, host: &str) -> String {
        format!(
            "{scheme}://{host}/{}?{}comp=batch{}{}",
            self.path, self.restype, self.sas, self.timeout
        )
    }
}
