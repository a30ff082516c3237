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

//! Rendering of individual query and header values
//!
//! The batch builders never format a value themselves, every query parameter
//! and header goes through a [`RequestSerializer`]. This lets a client supply
//! the same serialization rules it applies to its regular requests.

use crate::util::format_rfc1123;
use crate::{Error, Result};
use chrono::{DateTime, Utc};

/// A typed value handed to a [`RequestSerializer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializeValue<'a> {
    /// A plain string
    Str(&'a str),
    /// An integer
    Int(i64),
    /// A timestamp rendered as an RFC 1123 HTTP date
    Rfc1123(&'a DateTime<Utc>),
}

/// Bounds that a serialized value must satisfy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Constraints {
    /// Inclusive lower bound for integers
    pub minimum: Option<i64>,
    /// Inclusive upper bound for integers
    pub maximum: Option<i64>,
}

impl Constraints {
    /// No constraints
    pub const NONE: Self = Self {
        minimum: None,
        maximum: None,
    };

    /// Constrain integers to be at least `minimum`
    pub fn minimum(minimum: i64) -> Self {
        Self {
            minimum: Some(minimum),
            ..Default::default()
        }
    }
}

/// Renders query and header values for sub-requests
pub trait RequestSerializer: std::fmt::Debug + Send + Sync {
    /// Render the query parameter `name`
    ///
    /// The returned value is not percent-encoded, that happens when the
    /// request target is assembled.
    fn query(&self, name: &str, value: SerializeValue<'_>, constraints: Constraints)
        -> Result<String>;

    /// Render the header `name`
    fn header(&self, name: &str, value: SerializeValue<'_>) -> Result<String>;
}

/// The serialization rules of the Blob service REST API
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSerializer;

impl DefaultSerializer {
    fn render(name: &str, value: SerializeValue<'_>, constraints: Constraints) -> Result<String> {
        match value {
            SerializeValue::Str(s) => Ok(s.to_string()),
            SerializeValue::Int(i) => {
                if let Some(minimum) = constraints.minimum.filter(|m| i < *m) {
                    return Err(Error::InvalidArgument {
                        name: name.to_string(),
                        reason: format!("{i} is less than the minimum of {minimum}"),
                    });
                }
                if let Some(maximum) = constraints.maximum.filter(|m| i > *m) {
                    return Err(Error::InvalidArgument {
                        name: name.to_string(),
                        reason: format!("{i} is greater than the maximum of {maximum}"),
                    });
                }
                Ok(i.to_string())
            }
            SerializeValue::Rfc1123(date) => Ok(format_rfc1123(date)),
        }
    }
}

impl RequestSerializer for DefaultSerializer {
    fn query(
        &self,
        name: &str,
        value: SerializeValue<'_>,
        constraints: Constraints,
    ) -> Result<String> {
        Self::render(name, value, constraints)
    }

    fn header(&self, name: &str, value: SerializeValue<'_>) -> Result<String> {
        let rendered = Self::render(name, value, Constraints::NONE)?;
        if rendered.contains(['\r', '\n']) {
            return Err(Error::InvalidArgument {
                name: name.to_string(),
                reason: "header values must not contain line breaks".to_string(),
            });
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn query_values() {
        let s = DefaultSerializer;
        assert_eq!(
            s.query("snapshot", SerializeValue::Str("2021-01-01T00:00:00"), Constraints::NONE)
                .unwrap(),
            "2021-01-01T00:00:00"
        );
        assert_eq!(
            s.query("timeout", SerializeValue::Int(30), Constraints::minimum(0))
                .unwrap(),
            "30"
        );
        assert_eq!(
            s.query("timeout", SerializeValue::Int(0), Constraints::minimum(0))
                .unwrap(),
            "0"
        );
    }

    #[test]
    fn query_constraints() {
        let s = DefaultSerializer;
        let err = s
            .query("timeout", SerializeValue::Int(-1), Constraints::minimum(0))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for 'timeout': -1 is less than the minimum of 0"
        );

        let bounded = Constraints {
            minimum: Some(1),
            maximum: Some(10),
        };
        s.query("n", SerializeValue::Int(11), bounded).unwrap_err();
        s.query("n", SerializeValue::Int(10), bounded).unwrap();
    }

    #[test]
    fn header_values() {
        let s = DefaultSerializer;
        let date = Utc.with_ymd_and_hms(2022, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(
            s.header("if_modified_since", SerializeValue::Rfc1123(&date))
                .unwrap(),
            "Fri, 04 Mar 2022 05:06:07 GMT"
        );
        assert_eq!(
            s.header("lease_id", SerializeValue::Str("lease")).unwrap(),
            "lease"
        );
        s.header("lease_id", SerializeValue::Str("a\r\nb"))
            .unwrap_err();
    }
}
