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

use super::{
    call_tags, call_timeout, BlobItem, BlobTier, RehydratePriority, SubRequestOptions,
    ACCESS_TIER, IF_TAGS, LEASE_ID, REHYDRATE_PRIORITY,
};
use crate::request::{BatchOptions, SubRequest};
use crate::serialize::{Constraints, RequestSerializer, SerializeValue};
use crate::util::blob_path;
use crate::{Error, Result};
use http::Method;
use tracing::{debug, trace};

/// Options applying to every blob of a set tier batch
///
/// Any value set here overrides the corresponding value of every item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetTierOptions {
    /// Server timeout for the batch request, in seconds
    pub timeout: Option<u32>,
    /// Fail the whole batch if any sub-request fails, defaults to `true`
    pub raise_on_any_failure: bool,
    /// Rehydrate priority for blobs leaving the archive tier
    pub rehydrate_priority: Option<RehydratePriority>,
    /// Only change blobs whose tags match this SQL where clause
    pub if_tags_match_condition: Option<String>,
}

impl Default for SetTierOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            raise_on_any_failure: true,
            rehydrate_priority: None,
            if_tags_match_condition: None,
        }
    }
}

impl SetTierOptions {
    /// Create options with nothing overridden
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the server timeout in seconds
    pub fn with_timeout(mut self, timeout: u32) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Whether the batch fails if any sub-request fails
    pub fn with_raise_on_any_failure(mut self, raise: bool) -> Self {
        self.raise_on_any_failure = raise;
        self
    }

    /// Set the rehydrate priority for every blob
    pub fn with_rehydrate_priority(mut self, priority: RehydratePriority) -> Self {
        self.rehydrate_priority = Some(priority);
        self
    }

    /// Only change blobs whose tags match `condition`
    pub fn with_if_tags_match_condition(mut self, condition: impl Into<String>) -> Self {
        self.if_tags_match_condition = Some(condition.into());
        self
    }
}

#[derive(Debug, Default)]
struct SetTierBlobOptions<'a> {
    tier: Option<&'a BlobTier>,
    snapshot: Option<&'a str>,
    version_id: Option<&'a str>,
    rehydrate_priority: Option<RehydratePriority>,
    lease_id: Option<&'a str>,
    if_tags: Option<&'a str>,
    timeout: Option<u32>,
}

impl<'a> SetTierBlobOptions<'a> {
    fn resolve(item: &'a BlobItem, tier: Option<&'a BlobTier>, call: &'a SetTierOptions) -> Self {
        let tier = tier.filter(|t| !matches!(t, BlobTier::Other(s) if s.is_empty()));
        match item {
            BlobItem::Name(_) => Self {
                tier,
                rehydrate_priority: call.rehydrate_priority,
                if_tags: call_tags(call.if_tags_match_condition.as_deref()),
                ..Default::default()
            },
            BlobItem::Properties(blob) => Self {
                tier: tier.or(blob.blob_tier.as_ref()),
                snapshot: blob.snapshot.as_deref(),
                version_id: blob.version_id.as_deref(),
                rehydrate_priority: call.rehydrate_priority.or(blob.rehydrate_priority),
                lease_id: blob.lease_id.as_deref(),
                if_tags: call_tags(call.if_tags_match_condition.as_deref())
                    .or(blob.if_tags_match_condition.as_deref()),
                timeout: call_timeout(call.timeout).or(blob.timeout),
            },
        }
    }

    /// Serialize into the query parameters and headers of a
    /// [Set Blob Tier](https://learn.microsoft.com/en-us/rest/api/storageservices/set-blob-tier) request
    fn serialize<S: RequestSerializer + ?Sized>(
        &self,
        name: &str,
        serializer: &S,
    ) -> Result<SubRequestOptions> {
        let tier: &str = self
            .tier
            .map(AsRef::as_ref)
            .filter(|t: &&str| !t.is_empty())
            .ok_or(Error::MissingBlobTier)?;
        let non_empty = |s: Option<&str>| s.is_some_and(|s| !s.is_empty());
        if non_empty(self.snapshot) && non_empty(self.version_id) {
            return Err(Error::SnapshotAndVersionId {
                name: name.to_string(),
            });
        }

        let mut options = SubRequestOptions::default();
        options.query(
            serializer,
            "snapshot",
            "snapshot",
            self.snapshot.map(SerializeValue::Str),
            Constraints::NONE,
        )?;
        options.query(
            serializer,
            "versionid",
            "version_id",
            self.version_id.map(SerializeValue::Str),
            Constraints::NONE,
        )?;
        options.query(
            serializer,
            "timeout",
            "timeout",
            self.timeout.map(|t| SerializeValue::Int(t.into())),
            Constraints::minimum(0),
        )?;
        options.query(
            serializer,
            "comp",
            "comp",
            Some(SerializeValue::Str("tier")),
            Constraints::NONE,
        )?;

        options.header(
            serializer,
            &ACCESS_TIER,
            "tier",
            Some(SerializeValue::Str(tier)),
        )?;
        options.header(
            serializer,
            &REHYDRATE_PRIORITY,
            "rehydrate_priority",
            self.rehydrate_priority
                .as_ref()
                .map(|p| SerializeValue::Str(p.as_ref())),
        )?;
        options.header(
            serializer,
            &LEASE_ID,
            "lease_id",
            self.lease_id.map(SerializeValue::Str),
        )?;
        options.header(
            serializer,
            &IF_TAGS,
            "if_tags",
            self.if_tags.map(SerializeValue::Str),
        )?;
        Ok(options)
    }
}

/// Build the sub-requests of a batch setting the access tier of `blobs`
///
/// `blob_tier`, when given, applies to every blob; otherwise each item must
/// carry its own tier. Fails if an item has no resolvable tier or addresses
/// both a snapshot and a version.
///
/// <https://learn.microsoft.com/en-us/rest/api/storageservices/blob-batch>
pub fn generate_set_tier_requests<S, I>(
    query_str: &str,
    container_name: &str,
    blob_tier: Option<&BlobTier>,
    serializer: &S,
    blobs: I,
    options: &SetTierOptions,
) -> Result<(Vec<SubRequest>, BatchOptions)>
where
    S: RequestSerializer + ?Sized,
    I: IntoIterator,
    I::Item: Into<BlobItem>,
{
    let blobs = blobs.into_iter();
    let mut requests = Vec::with_capacity(blobs.size_hint().0);

    for blob in blobs {
        let blob: BlobItem = blob.into();
        let parts = SetTierBlobOptions::resolve(&blob, blob_tier, options)
            .serialize(blob.name(), serializer)?;

        let path = blob_path(container_name, blob.name(), query_str);
        trace!(%path, "set tier sub-request");

        let mut request = SubRequest::new(Method::PUT, path, parts.headers);
        request.format_parameters(parts.query);
        requests.push(request);
    }

    debug!(
        container = container_name,
        sub_requests = requests.len(),
        "built set tier batch"
    );

    let batch = BatchOptions::new(
        query_str,
        container_name,
        options.timeout,
        options.raise_on_any_failure,
    );
    Ok((requests, batch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BlobProperties;
    use crate::serialize::DefaultSerializer;

    fn build(
        tier: Option<&BlobTier>,
        blobs: Vec<BlobItem>,
        options: &SetTierOptions,
    ) -> Result<(Vec<SubRequest>, BatchOptions)> {
        generate_set_tier_requests("?sig=abc", "c", tier, &DefaultSerializer, blobs, options)
    }

    #[test]
    fn set_tier_requests() {
        let blobs = vec![
            "a".into(),
            BlobProperties::new("b")
                .with_version_id("v1")
                .with_lease_id("l1")
                .into(),
        ];
        let (requests, batch) =
            build(Some(&BlobTier::Cool), blobs, &SetTierOptions::default()).unwrap();

        assert_eq!(requests.len(), 2);
        for r in &requests {
            assert_eq!(r.method(), Method::PUT);
            assert_eq!(r.query_param("comp"), Some("tier"));
            assert_eq!(r.header("x-ms-access-tier"), Some("Cool"));
        }
        assert_eq!(requests[0].path(), "/c/a?sig=abc");
        assert_eq!(requests[0].url(), "/c/a?comp=tier&sig=abc");
        assert_eq!(requests[0].header("x-ms-lease-id"), None);

        assert_eq!(requests[1].path(), "/c/b?sig=abc");
        assert_eq!(requests[1].query_param("versionid"), Some("v1"));
        assert_eq!(requests[1].header("x-ms-lease-id"), Some("l1"));
        assert_eq!(requests[1].url(), "/c/b?versionid=v1&comp=tier&sig=abc");

        assert!(batch.raise_on_any_failure);
        assert_eq!(batch.sas, "&sig=abc");
    }

    #[test]
    fn call_level_tier_wins() {
        let blobs = vec![
            BlobProperties::new("a")
                .with_blob_tier(BlobTier::Archive)
                .into(),
            BlobProperties::new("b").with_blob_tier(BlobTier::P10).into(),
        ];

        let (requests, _) =
            build(Some(&BlobTier::Hot), blobs.clone(), &SetTierOptions::default()).unwrap();
        assert_eq!(requests[0].header("x-ms-access-tier"), Some("Hot"));
        assert_eq!(requests[1].header("x-ms-access-tier"), Some("Hot"));

        let (requests, _) = build(None, blobs, &SetTierOptions::default()).unwrap();
        assert_eq!(requests[0].header("x-ms-access-tier"), Some("Archive"));
        assert_eq!(requests[1].header("x-ms-access-tier"), Some("P10"));
    }

    #[test]
    fn missing_tier() {
        let err = build(None, vec!["a".into()], &SetTierOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MissingBlobTier));
        assert_eq!(err.to_string(), "A blob tier must be specified");

        let err = build(
            None,
            vec![BlobProperties::new("a").into()],
            &SetTierOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingBlobTier));

        let empty = BlobTier::Other(String::new());
        let err = build(Some(&empty), vec!["a".into()], &SetTierOptions::default()).unwrap_err();
        assert!(matches!(err, Error::MissingBlobTier));
    }

    #[test]
    fn snapshot_and_version_conflict() {
        let blobs = vec![
            "ok".into(),
            BlobProperties::new("both")
                .with_snapshot("s")
                .with_version_id("v")
                .into(),
        ];
        let err = build(Some(&BlobTier::Cold), blobs, &SetTierOptions::default()).unwrap_err();
        match err {
            Error::SnapshotAndVersionId { name } => assert_eq!(name, "both"),
            e => panic!("unexpected error {e}"),
        }

        let blobs = vec![
            BlobProperties::new("empty_snapshot")
                .with_snapshot("")
                .with_version_id("v")
                .into(),
            BlobProperties::new("empty_version")
                .with_snapshot("s")
                .with_version_id("")
                .into(),
        ];
        let (requests, _) = build(Some(&BlobTier::Cold), blobs, &SetTierOptions::default()).unwrap();
        assert_eq!(requests[0].query_param("versionid"), Some("v"));
        assert_eq!(requests[1].query_param("snapshot"), Some("s"));
    }

    #[test]
    fn empty_call_level_values_fall_back() {
        let options = SetTierOptions::new()
            .with_timeout(0)
            .with_if_tags_match_condition("");
        let blobs = vec![
            BlobProperties::new("a")
                .with_blob_tier(BlobTier::Hot)
                .with_timeout(60)
                .with_if_tags_match_condition("x = 'y'")
                .into(),
        ];
        let empty = BlobTier::Other(String::new());
        let (requests, batch) = build(Some(&empty), blobs, &options).unwrap();

        assert_eq!(requests[0].header("x-ms-access-tier"), Some("Hot"));
        assert_eq!(requests[0].query_param("timeout"), Some("60"));
        assert_eq!(requests[0].header("x-ms-if-tags"), Some("x = 'y'"));
        assert_eq!(batch.timeout, "");

        let err = build(Some(&empty), vec!["bare".into()], &options).unwrap_err();
        assert!(matches!(err, Error::MissingBlobTier));
    }

    #[test]
    fn rehydrate_tags_and_timeout() {
        let options = SetTierOptions::new()
            .with_rehydrate_priority(RehydratePriority::High)
            .with_timeout(10);
        let blobs = vec![
            BlobProperties::new("a")
                .with_rehydrate_priority(RehydratePriority::Standard)
                .with_if_tags_match_condition("t = '1'")
                .with_snapshot("snap")
                .into(),
            BlobProperties::new("b").with_timeout(99).into(),
            "c".into(),
        ];
        let (requests, batch) = build(Some(&BlobTier::Hot), blobs.clone(), &options).unwrap();

        assert_eq!(requests[0].header("x-ms-rehydrate-priority"), Some("High"));
        assert_eq!(requests[0].header("x-ms-if-tags"), Some("t = '1'"));
        assert_eq!(requests[0].query_param("snapshot"), Some("snap"));
        assert_eq!(requests[0].query_param("timeout"), Some("10"));
        assert_eq!(requests[1].query_param("timeout"), Some("10"));
        assert_eq!(requests[2].header("x-ms-rehydrate-priority"), Some("High"));
        assert_eq!(requests[2].query_param("timeout"), None);
        assert_eq!(batch.timeout, "&timeout=10");

        let options = SetTierOptions::new().with_if_tags_match_condition("t = '2'");
        let (requests, batch) = build(Some(&BlobTier::Hot), blobs, &options).unwrap();
        assert_eq!(
            requests[0].header("x-ms-rehydrate-priority"),
            Some("Standard")
        );
        assert_eq!(requests[0].header("x-ms-if-tags"), Some("t = '2'"));
        assert_eq!(requests[1].query_param("timeout"), Some("99"));
        assert_eq!(requests[2].header("x-ms-rehydrate-priority"), None);
        assert_eq!(requests[2].header("x-ms-if-tags"), Some("t = '2'"));
        assert_eq!(batch.timeout, "");
    }

    #[test]
    fn empty_batch() {
        let (requests, batch) = build(None, vec![], &SetTierOptions::default()).unwrap();
        assert!(requests.is_empty());
        assert_eq!(batch.path, "c");
    }
}
