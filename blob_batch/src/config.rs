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

//! String keyed configuration of batch options
//!
//! # Example
//! ```
//! # use blob_batch::{BatchConfigKey, DeleteBlobsOptions};
//! let options = DeleteBlobsOptions::new()
//!     .with_config("delete_snapshots".parse().unwrap(), "include")
//!     .unwrap()
//!     .with_config(BatchConfigKey::Timeout, "30")
//!     .unwrap();
//!
//! assert_eq!(options.timeout, Some(30));
//! assert_eq!(
//!     options.get_config_value(&BatchConfigKey::DeleteSnapshots).as_deref(),
//!     Some("include")
//! );
//! ```

use crate::batch::{DeleteBlobsOptions, SetTierOptions};
use crate::util::{format_rfc1123, parse_http_date};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Configuration keys for [`DeleteBlobsOptions`] and [`SetTierOptions`]
#[derive(PartialEq, Eq, Hash, Clone, Debug, Copy, Deserialize, Serialize)]
#[non_exhaustive]
pub enum BatchConfigKey {
    /// Server timeout in seconds
    ///
    /// Supported keys:
    /// - `timeout`
    Timeout,

    /// Fail the whole batch if any sub-request fails
    ///
    /// Supported keys:
    /// - `raise_on_any_failure`
    RaiseOnAnyFailure,

    /// Which snapshots to delete, `only` or `include`
    ///
    /// Supported keys:
    /// - `delete_snapshots`
    DeleteSnapshots,

    /// Only operate if modified since, an HTTP date or RFC 3339 timestamp
    ///
    /// Supported keys:
    /// - `if_modified_since`
    IfModifiedSince,

    /// Only operate if not modified since, an HTTP date or RFC 3339 timestamp
    ///
    /// Supported keys:
    /// - `if_unmodified_since`
    IfUnmodifiedSince,

    /// A SQL where clause on blob tags
    ///
    /// Supported keys:
    /// - `if_tags_match_condition`
    /// - `if_tags`
    IfTagsMatchCondition,

    /// Rehydrate priority, `High` or `Standard`
    ///
    /// Supported keys:
    /// - `rehydrate_priority`
    RehydratePriority,
}

impl AsRef<str> for BatchConfigKey {
    fn as_ref(&self) -> &str {
        match self {
            Self::Timeout => "timeout",
            Self::RaiseOnAnyFailure => "raise_on_any_failure",
            Self::DeleteSnapshots => "delete_snapshots",
            Self::IfModifiedSince => "if_modified_since",
            Self::IfUnmodifiedSince => "if_unmodified_since",
            Self::IfTagsMatchCondition => "if_tags_match_condition",
            Self::RehydratePriority => "rehydrate_priority",
        }
    }
}

impl FromStr for BatchConfigKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "timeout" => Ok(Self::Timeout),
            "raise_on_any_failure" => Ok(Self::RaiseOnAnyFailure),
            "delete_snapshots" => Ok(Self::DeleteSnapshots),
            "if_modified_since" => Ok(Self::IfModifiedSince),
            "if_unmodified_since" => Ok(Self::IfUnmodifiedSince),
            "if_tags_match_condition" | "if_tags" => Ok(Self::IfTagsMatchCondition),
            "rehydrate_priority" => Ok(Self::RehydratePriority),
            _ => Err(Error::UnknownConfigurationKey { key: s.into() }),
        }
    }
}

fn invalid(key: BatchConfigKey, value: &str) -> Error {
    Error::InvalidConfigValue {
        key: key.as_ref().to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(key: BatchConfigKey, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Ok(true),
        "false" | "0" | "no" | "n" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn parse_timeout(key: BatchConfigKey, value: &str) -> Result<u32> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn parse_date(key: BatchConfigKey, value: &str) -> Result<DateTime<Utc>> {
    parse_http_date(value.trim()).ok_or_else(|| invalid(key, value))
}

impl DeleteBlobsOptions {
    /// Set an option via a key - value pair
    pub fn with_config(mut self, key: BatchConfigKey, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        match key {
            BatchConfigKey::Timeout => self.timeout = Some(parse_timeout(key, &value)?),
            BatchConfigKey::RaiseOnAnyFailure => {
                self.raise_on_any_failure = parse_bool(key, &value)?
            }
            BatchConfigKey::DeleteSnapshots => {
                self.delete_snapshots = Some(value.parse().map_err(|_| invalid(key, &value))?)
            }
            BatchConfigKey::IfModifiedSince => {
                self.if_modified_since = Some(parse_date(key, &value)?)
            }
            BatchConfigKey::IfUnmodifiedSince => {
                self.if_unmodified_since = Some(parse_date(key, &value)?)
            }
            BatchConfigKey::IfTagsMatchCondition => self.if_tags_match_condition = Some(value),
            BatchConfigKey::RehydratePriority => {
                return Err(Error::UnsupportedConfigurationKey {
                    key: key.as_ref().to_string(),
                    operation: "delete blobs",
                })
            }
        }
        Ok(self)
    }

    /// Get the value of an option, if set
    pub fn get_config_value(&self, key: &BatchConfigKey) -> Option<String> {
        match key {
            BatchConfigKey::Timeout => self.timeout.map(|t| t.to_string()),
            BatchConfigKey::RaiseOnAnyFailure => Some(self.raise_on_any_failure.to_string()),
            BatchConfigKey::DeleteSnapshots => self.delete_snapshots.map(|d| d.to_string()),
            BatchConfigKey::IfModifiedSince => self.if_modified_since.as_ref().map(format_rfc1123),
            BatchConfigKey::IfUnmodifiedSince => {
                self.if_unmodified_since.as_ref().map(format_rfc1123)
            }
            BatchConfigKey::IfTagsMatchCondition => self.if_tags_match_condition.clone(),
            BatchConfigKey::RehydratePriority => None,
        }
    }
}

impl SetTierOptions {
    /// Set an option via a key - value pair
    pub fn with_config(mut self, key: BatchConfigKey, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        match key {
            BatchConfigKey::Timeout => self.timeout = Some(parse_timeout(key, &value)?),
            BatchConfigKey::RaiseOnAnyFailure => {
                self.raise_on_any_failure = parse_bool(key, &value)?
            }
            BatchConfigKey::IfTagsMatchCondition => self.if_tags_match_condition = Some(value),
            BatchConfigKey::RehydratePriority => {
                self.rehydrate_priority = Some(value.parse().map_err(|_| invalid(key, &value))?)
            }
            BatchConfigKey::DeleteSnapshots
            | BatchConfigKey::IfModifiedSince
            | BatchConfigKey::IfUnmodifiedSince => {
                return Err(Error::UnsupportedConfigurationKey {
                    key: key.as_ref().to_string(),
                    operation: "set tier",
                })
            }
        }
        Ok(self)
    }

    /// Get the value of an option, if set
    pub fn get_config_value(&self, key: &BatchConfigKey) -> Option<String> {
        match key {
            BatchConfigKey::Timeout => self.timeout.map(|t| t.to_string()),
            BatchConfigKey::RaiseOnAnyFailure => Some(self.raise_on_any_failure.to_string()),
            BatchConfigKey::IfTagsMatchCondition => self.if_tags_match_condition.clone(),
            BatchConfigKey::RehydratePriority => self.rehydrate_priority.map(|p| p.to_string()),
            BatchConfigKey::DeleteSnapshots
            | BatchConfigKey::IfModifiedSince
            | BatchConfigKey::IfUnmodifiedSince => None,
        }
    }
}
