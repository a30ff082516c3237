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

//! Sub-request builders for the Blob Batch API
//!
//! A batch addresses many blobs of one container with a single HTTP request.
//! The builders in this module turn a list of [`BlobItem`] into one
//! [`SubRequest`](crate::SubRequest) per item, in input order, so that the
//! responses can be correlated back to their item by position.
//!
//! Options given for the whole call take precedence over those given on an
//! individual item: an item-level value is only used when the call-level
//! value is absent.

use crate::serialize::{Constraints, RequestSerializer, SerializeValue};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

mod delete;
mod tier;

pub use delete::{generate_delete_blobs_requests, DeleteBlobsOptions};
pub use tier::{generate_set_tier_requests, SetTierOptions};

pub(crate) static DELETE_SNAPSHOTS: HeaderName = HeaderName::from_static("x-ms-delete-snapshots");
pub(crate) static LEASE_ID: HeaderName = HeaderName::from_static("x-ms-lease-id");
pub(crate) static IF_TAGS: HeaderName = HeaderName::from_static("x-ms-if-tags");
pub(crate) static ACCESS_TIER: HeaderName = HeaderName::from_static("x-ms-access-tier");
pub(crate) static REHYDRATE_PRIORITY: HeaderName =
    HeaderName::from_static("x-ms-rehydrate-priority");

/// Which snapshots to remove when deleting a blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteSnapshots {
    /// Delete only the snapshots of the blob
    Only,
    /// Delete the blob and all of its snapshots
    Include,
}

impl AsRef<str> for DeleteSnapshots {
    fn as_ref(&self) -> &str {
        match self {
            Self::Only => "only",
            Self::Include => "include",
        }
    }
}

impl FromStr for DeleteSnapshots {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "only" => Ok(Self::Only),
            "include" => Ok(Self::Include),
            _ => Err(Error::InvalidArgument {
                name: "delete_snapshots".to_string(),
                reason: format!("expected 'only' or 'include', got '{s}'"),
            }),
        }
    }
}

impl Display for DeleteSnapshots {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// How an etag is compared against the blob's current etag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchConditions {
    /// No condition
    Unconditionally,
    /// Only if the etag matches, sent as `If-Match`
    IfNotModified,
    /// Only if the etag differs, sent as `If-None-Match`
    IfModified,
    /// Only if the blob exists, sent as `If-Match: *`
    IfPresent,
    /// Only if the blob does not exist, sent as `If-None-Match: *`
    IfMissing,
}

/// The access tier of a blob
///
/// <https://learn.microsoft.com/en-us/azure/storage/blobs/access-tiers-overview>
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum BlobTier {
    /// Standard hot tier
    Hot,
    /// Standard cool tier
    Cool,
    /// Standard cold tier
    Cold,
    /// Standard archive tier
    Archive,
    /// Premium page blob tier P4
    P4,
    /// Premium page blob tier P6
    P6,
    /// Premium page blob tier P10
    P10,
    /// Premium page blob tier P15
    P15,
    /// Premium page blob tier P20
    P20,
    /// Premium page blob tier P30
    P30,
    /// Premium page blob tier P40
    P40,
    /// Premium page blob tier P50
    P50,
    /// Premium page blob tier P60
    P60,
    /// Premium page blob tier P70
    P70,
    /// Premium page blob tier P80
    P80,
    /// A tier not known to this crate, sent as is
    Other(String),
}

impl AsRef<str> for BlobTier {
    fn as_ref(&self) -> &str {
        match self {
            Self::Hot => "Hot",
            Self::Cool => "Cool",
            Self::Cold => "Cold",
            Self::Archive => "Archive",
            Self::P4 => "P4",
            Self::P6 => "P6",
            Self::P10 => "P10",
            Self::P15 => "P15",
            Self::P20 => "P20",
            Self::P30 => "P30",
            Self::P40 => "P40",
            Self::P50 => "P50",
            Self::P60 => "P60",
            Self::P70 => "P70",
            Self::P80 => "P80",
            Self::Other(s) => s,
        }
    }
}

impl FromStr for BlobTier {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "hot" => Self::Hot,
            "cool" => Self::Cool,
            "cold" => Self::Cold,
            "archive" => Self::Archive,
            "p4" => Self::P4,
            "p6" => Self::P6,
            "p10" => Self::P10,
            "p15" => Self::P15,
            "p20" => Self::P20,
            "p30" => Self::P30,
            "p40" => Self::P40,
            "p50" => Self::P50,
            "p60" => Self::P60,
            "p70" => Self::P70,
            "p80" => Self::P80,
            _ => Self::Other(s.to_string()),
        })
    }
}

impl Display for BlobTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// The priority with which to rehydrate an archived blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RehydratePriority {
    /// Rehydrate within an hour where possible
    High,
    /// Rehydrate in the order requests are received
    Standard,
}

impl AsRef<str> for RehydratePriority {
    fn as_ref(&self) -> &str {
        match self {
            Self::High => "High",
            Self::Standard => "Standard",
        }
    }
}

impl FromStr for RehydratePriority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(Self::High),
            "standard" => Ok(Self::Standard),
            _ => Err(Error::InvalidArgument {
                name: "rehydrate_priority".to_string(),
                reason: format!("expected 'High' or 'Standard', got '{s}'"),
            }),
        }
    }
}

impl Display for RehydratePriority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// A blob to include in a batch, with per-blob options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlobProperties {
    /// The blob name
    pub name: String,
    /// The snapshot to address
    pub snapshot: Option<String>,
    /// The version to address
    pub version_id: Option<String>,
    /// Which snapshots to delete along with the blob
    pub delete_snapshots: Option<DeleteSnapshots>,
    /// Only operate if modified since this time
    pub if_modified_since: Option<DateTime<Utc>>,
    /// Only operate if not modified since this time
    pub if_unmodified_since: Option<DateTime<Utc>>,
    /// The etag to compare against
    pub etag: Option<String>,
    /// How to compare [`Self::etag`], defaults to [`MatchConditions::IfNotModified`]
    pub match_condition: Option<MatchConditions>,
    /// A SQL where clause on blob tags
    pub if_tags_match_condition: Option<String>,
    /// The active lease on the blob
    pub lease_id: Option<String>,
    /// Server timeout for this sub-request, in seconds
    pub timeout: Option<u32>,
    /// The tier to move the blob to
    pub blob_tier: Option<BlobTier>,
    /// Rehydrate priority when moving out of the archive tier
    pub rehydrate_priority: Option<RehydratePriority>,
}

impl BlobProperties {
    /// Create a new [`BlobProperties`] for `name` with no options set
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Address the given snapshot
    pub fn with_snapshot(mut self, snapshot: impl Into<String>) -> Self {
        self.snapshot = Some(snapshot.into());
        self
    }

    /// Address the given version
    pub fn with_version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    /// Set which snapshots to delete
    pub fn with_delete_snapshots(mut self, delete_snapshots: DeleteSnapshots) -> Self {
        self.delete_snapshots = Some(delete_snapshots);
        self
    }

    /// Only operate if modified since `t`
    pub fn with_if_modified_since(mut self, t: DateTime<Utc>) -> Self {
        self.if_modified_since = Some(t);
        self
    }

    /// Only operate if not modified since `t`
    pub fn with_if_unmodified_since(mut self, t: DateTime<Utc>) -> Self {
        self.if_unmodified_since = Some(t);
        self
    }

    /// Set the etag to compare against
    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Set how the etag is compared
    pub fn with_match_condition(mut self, condition: MatchConditions) -> Self {
        self.match_condition = Some(condition);
        self
    }

    /// Only operate if the blob tags match `condition`
    pub fn with_if_tags_match_condition(mut self, condition: impl Into<String>) -> Self {
        self.if_tags_match_condition = Some(condition.into());
        self
    }

    /// Set the active lease id
    pub fn with_lease_id(mut self, lease_id: impl Into<String>) -> Self {
        self.lease_id = Some(lease_id.into());
        self
    }

    /// Set the server timeout in seconds
    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the target tier
    pub fn with_blob_tier(mut self, tier: BlobTier) -> Self {
        self.blob_tier = Some(tier);
        self
    }

    /// Set the rehydrate priority
    pub fn with_rehydrate_priority(mut self, priority: RehydratePriority) -> Self {
        self.rehydrate_priority = Some(priority);
        self
    }
}

/// An entry of a batch, either a bare blob name or a blob with options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobItem {
    /// Only the name, call-level options apply
    Name(String),
    /// A blob with its own options
    Properties(BlobProperties),
}

impl BlobItem {
    /// The blob name
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Properties(props) => &props.name,
        }
    }
}

impl From<&str> for BlobItem {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for BlobItem {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<BlobProperties> for BlobItem {
    fn from(props: BlobProperties) -> Self {
        Self::Properties(props)
    }
}

/// A call-level tag condition, treating an empty condition as unset
pub(crate) fn call_tags(condition: Option<&str>) -> Option<&str> {
    condition.filter(|c| !c.is_empty())
}

/// A call-level timeout, treating zero as unset
pub(crate) fn call_timeout(timeout: Option<u32>) -> Option<u32> {
    timeout.filter(|t| *t > 0)
}

/// Resolves `If-Match` / `If-None-Match` for an etag and match condition
///
/// Returns `(if_match, if_none_match)`
pub(crate) fn match_headers(
    etag: Option<&str>,
    condition: Option<MatchConditions>,
) -> (Option<&str>, Option<&str>) {
    let Some(etag) = etag else {
        return (None, None);
    };
    match condition.unwrap_or(MatchConditions::IfNotModified) {
        MatchConditions::IfNotModified => (Some(etag), None),
        MatchConditions::IfModified => (None, Some(etag)),
        MatchConditions::IfPresent => (Some("*"), None),
        MatchConditions::IfMissing => (None, Some("*")),
        MatchConditions::Unconditionally => (None, None),
    }
}

/// Query parameters and headers of a single sub-request
#[derive(Debug, Default)]
pub(crate) struct SubRequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
}

impl SubRequestOptions {
    /// Serialize and add query parameter `key` if `value` is present
    pub fn query<S: RequestSerializer + ?Sized>(
        &mut self,
        serializer: &S,
        key: &str,
        name: &str,
        value: Option<SerializeValue<'_>>,
        constraints: Constraints,
    ) -> Result<()> {
        if let Some(value) = value {
            let rendered = serializer.query(name, value, constraints)?;
            self.query.push((key.to_string(), rendered));
        }
        Ok(())
    }

    /// Serialize and add `header` if `value` is present
    pub fn header<S: RequestSerializer + ?Sized>(
        &mut self,
        serializer: &S,
        header: &HeaderName,
        name: &str,
        value: Option<SerializeValue<'_>>,
    ) -> Result<()> {
        if let Some(value) = value {
            let rendered = serializer.header(name, value)?;
            let value = HeaderValue::try_from(rendered).map_err(|source| {
                Error::InvalidHeaderValue {
                    name: header.to_string(),
                    source,
                }
            })?;
            self.headers.insert(header.clone(), value);
        }
        Ok(())
    }
}
