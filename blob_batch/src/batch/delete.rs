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
    call_tags, call_timeout, match_headers, BlobItem, DeleteSnapshots, MatchConditions,
    SubRequestOptions, DELETE_SNAPSHOTS, IF_TAGS, LEASE_ID,
};
use crate::request::{BatchOptions, SubRequest};
use crate::serialize::{Constraints, RequestSerializer, SerializeValue};
use crate::util::blob_path;
use crate::Result;
use chrono::{DateTime, Utc};
use http::header::{IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_UNMODIFIED_SINCE};
use http::Method;
use tracing::{debug, trace};

/// Options applying to every blob of a delete batch
///
/// Any value set here overrides the corresponding value of every item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteBlobsOptions {
    /// Server timeout for the batch request, in seconds
    pub timeout: Option<u32>,
    /// Fail the whole batch if any sub-request fails, defaults to `true`
    pub raise_on_any_failure: bool,
    /// Which snapshots to delete along with each blob
    pub delete_snapshots: Option<DeleteSnapshots>,
    /// Only delete blobs modified since this time
    pub if_modified_since: Option<DateTime<Utc>>,
    /// Only delete blobs not modified since this time
    pub if_unmodified_since: Option<DateTime<Utc>>,
    /// Only delete blobs whose tags match this SQL where clause
    pub if_tags_match_condition: Option<String>,
}

impl Default for DeleteBlobsOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            raise_on_any_failure: true,
            delete_snapshots: None,
            if_modified_since: None,
            if_unmodified_since: None,
            if_tags_match_condition: None,
        }
    }
}

impl DeleteBlobsOptions {
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

    /// Set which snapshots to delete for every blob
    pub fn with_delete_snapshots(mut self, delete_snapshots: DeleteSnapshots) -> Self {
        self.delete_snapshots = Some(delete_snapshots);
        self
    }

    /// Only delete blobs modified since `t`
    pub fn with_if_modified_since(mut self, t: DateTime<Utc>) -> Self {
        self.if_modified_since = Some(t);
        self
    }

    /// Only delete blobs not modified since `t`
    pub fn with_if_unmodified_since(mut self, t: DateTime<Utc>) -> Self {
        self.if_unmodified_since = Some(t);
        self
    }

    /// Only delete blobs whose tags match `condition`
    pub fn with_if_tags_match_condition(mut self, condition: impl Into<String>) -> Self {
        self.if_tags_match_condition = Some(condition.into());
        self
    }
}

/// The effective options of a single delete sub-request
#[derive(Debug, Default)]
struct DeleteBlobOptions<'a> {
    snapshot: Option<&'a str>,
    version_id: Option<&'a str>,
    delete_snapshots: Option<DeleteSnapshots>,
    lease_id: Option<&'a str>,
    if_modified_since: Option<&'a DateTime<Utc>>,
    if_unmodified_since: Option<&'a DateTime<Utc>>,
    etag: Option<&'a str>,
    match_condition: Option<MatchConditions>,
    if_tags: Option<&'a str>,
    timeout: Option<u32>,
}

impl<'a> DeleteBlobOptions<'a> {
    fn resolve(item: &'a BlobItem, call: &'a DeleteBlobsOptions) -> Self {
        match item {
            BlobItem::Name(_) => Self {
                delete_snapshots: call.delete_snapshots,
                if_modified_since: call.if_modified_since.as_ref(),
                if_unmodified_since: call.if_unmodified_since.as_ref(),
                if_tags: call_tags(call.if_tags_match_condition.as_deref()),
                ..Default::default()
            },
            BlobItem::Properties(blob) => Self {
                snapshot: blob.snapshot.as_deref(),
                version_id: blob.version_id.as_deref(),
                delete_snapshots: call.delete_snapshots.or(blob.delete_snapshots),
                lease_id: blob.lease_id.as_deref(),
                if_modified_since: call
                    .if_modified_since
                    .as_ref()
                    .or(blob.if_modified_since.as_ref()),
                if_unmodified_since: call
                    .if_unmodified_since
                    .as_ref()
                    .or(blob.if_unmodified_since.as_ref()),
                etag: blob.etag.as_deref(),
                match_condition: blob
                    .etag
                    .as_ref()
                    .map(|_| blob.match_condition.unwrap_or(MatchConditions::IfNotModified)),
                if_tags: call_tags(call.if_tags_match_condition.as_deref())
                    .or(blob.if_tags_match_condition.as_deref()),
                timeout: call_timeout(call.timeout).or(blob.timeout),
            },
        }
    }

    /// Serialize into the query parameters and headers of a
    /// [Delete Blob](https://learn.microsoft.com/en-us/rest/api/storageservices/delete-blob) request
    fn serialize<S: RequestSerializer + ?Sized>(&self, serializer: &S) -> Result<SubRequestOptions> {
        let (if_match, if_none_match) = match_headers(self.etag, self.match_condition);

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

        options.header(
            serializer,
            &DELETE_SNAPSHOTS,
            "delete_snapshots",
            self.delete_snapshots
                .as_ref()
                .map(|d| SerializeValue::Str(d.as_ref())),
        )?;
        options.header(
            serializer,
            &LEASE_ID,
            "lease_id",
            self.lease_id.map(SerializeValue::Str),
        )?;
        options.header(
            serializer,
            &IF_MODIFIED_SINCE,
            "if_modified_since",
            self.if_modified_since.map(SerializeValue::Rfc1123),
        )?;
        options.header(
            serializer,
            &IF_UNMODIFIED_SINCE,
            "if_unmodified_since",
            self.if_unmodified_since.map(SerializeValue::Rfc1123),
        )?;
        options.header(
            serializer,
            &IF_MATCH,
            "if_match",
            if_match.map(SerializeValue::Str),
        )?;
        options.header(
            serializer,
            &IF_NONE_MATCH,
            "if_none_match",
            if_none_match.map(SerializeValue::Str),
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

/// Build the sub-requests of a batch deleting `blobs` from `container_name`
///
/// `query_str` is the query string of the container URL, e.g. a SAS token
/// starting with `?`, and is appended to every sub-request path. Requests are
/// returned in the order of `blobs`, together with the options needed to send
/// the batch itself.
///
/// <https://learn.microsoft.com/en-us/rest/api/storageservices/blob-batch>
///
/// ```
/// # use blob_batch::{generate_delete_blobs_requests, BlobItem, BlobProperties, DefaultSerializer, DeleteBlobsOptions};
/// let (requests, batch) = generate_delete_blobs_requests(
///     "?sv=2020&sig=abc",
///     "mycontainer",
///     &DefaultSerializer,
///     [
///         BlobItem::from("blobA"),
///         BlobProperties::new("blobB").with_snapshot("2021-01-01T00:00:00").into(),
///     ],
///     &DeleteBlobsOptions::default(),
/// )
/// .unwrap();
///
/// assert_eq!(requests[0].path(), "/mycontainer/blobA?sv=2020&sig=abc");
/// assert_eq!(requests[1].query_param("snapshot"), Some("2021-01-01T00:00:00"));
/// assert!(batch.raise_on_any_failure);
/// ```
pub fn generate_delete_blobs_requests<S, I>(
    query_str: &str,
    container_name: &str,
    serializer: &S,
    blobs: I,
    options: &DeleteBlobsOptions,
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
        let parts = DeleteBlobOptions::resolve(&blob, options).serialize(serializer)?;

        let path = blob_path(container_name, blob.name(), query_str);
        trace!(%path, "delete sub-request");

        let mut request = SubRequest::new(Method::DELETE, path, parts.headers);
        request.format_parameters(parts.query);
        requests.push(request);
    }

    debug!(
        container = container_name,
        sub_requests = requests.len(),
        "built delete blobs batch"
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
    use crate::Error;
    use chrono::TimeZone;

    fn build(
        blobs: Vec<BlobItem>,
        options: &DeleteBlobsOptions,
    ) -> (Vec<SubRequest>, BatchOptions) {
        generate_delete_blobs_requests("?sv=2020&sig=abc", "mycontainer", &DefaultSerializer, blobs, options)
            .unwrap()
    }

    #[test]
    fn delete_example() {
        let (requests, batch) = build(
            vec![
                "blobA".into(),
                BlobProperties::new("blobB")
                    .with_snapshot("2021-01-01T00:00:00")
                    .into(),
            ],
            &DeleteBlobsOptions::default(),
        );

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method(), Method::DELETE);
        assert_eq!(requests[0].path(), "/mycontainer/blobA?sv=2020&sig=abc");
        assert!(requests[0].query().is_empty());
        assert!(requests[0].headers().is_empty());

        assert_eq!(requests[1].method(), Method::DELETE);
        assert_eq!(requests[1].path(), "/mycontainer/blobB?sv=2020&sig=abc");
        assert_eq!(
            requests[1].query_param("snapshot"),
            Some("2021-01-01T00:00:00")
        );

        assert!(batch.raise_on_any_failure);
        assert_eq!(batch.sas, "&sv=2020&sig=abc");
        assert_eq!(batch.timeout, "");
        assert_eq!(batch.path, "mycontainer");
        assert_eq!(batch.restype, "restype=container&");
    }

    #[test]
    fn preserves_order() {
        let (requests, _) = build(vec![], &DeleteBlobsOptions::default());
        assert!(requests.is_empty());

        let (requests, _) = build(vec!["only".into()], &DeleteBlobsOptions::default());
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path(), "/mycontainer/only?sv=2020&sig=abc");

        let names = ["z", "a", "m/n", "b"];
        let blobs = names.iter().map(|n| BlobItem::from(*n)).collect();
        let (requests, _) = build(blobs, &DeleteBlobsOptions::default());
        let paths: Vec<_> = requests.iter().map(|r| r.path().to_string()).collect();
        let expected: Vec<_> = names
            .iter()
            .map(|n| format!("/mycontainer/{n}?sv=2020&sig=abc"))
            .collect();
        assert_eq!(paths, expected);
    }

    #[test]
    fn call_level_delete_snapshots_wins() {
        let blobs = vec![
            BlobProperties::new("a")
                .with_delete_snapshots(DeleteSnapshots::Only)
                .into(),
            BlobProperties::new("b").into(),
            "c".into(),
        ];

        let options = DeleteBlobsOptions::new().with_delete_snapshots(DeleteSnapshots::Include);
        let (requests, _) = build(blobs.clone(), &options);
        for r in &requests {
            assert_eq!(r.header("x-ms-delete-snapshots"), Some("include"));
        }

        let (requests, _) = build(blobs, &DeleteBlobsOptions::default());
        assert_eq!(requests[0].header("x-ms-delete-snapshots"), Some("only"));
        assert_eq!(requests[1].header("x-ms-delete-snapshots"), None);
        assert_eq!(requests[2].header("x-ms-delete-snapshots"), None);
    }

    #[test]
    fn modification_preconditions() {
        let call = Utc.with_ymd_and_hms(2022, 3, 4, 5, 6, 7).unwrap();
        let item = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();

        let blobs = vec![
            BlobProperties::new("a")
                .with_if_modified_since(item)
                .with_if_unmodified_since(item)
                .into(),
            "b".into(),
        ];

        let (requests, _) = build(blobs.clone(), &DeleteBlobsOptions::default());
        assert_eq!(
            requests[0].header("if-modified-since"),
            Some("Fri, 01 Jan 2021 00:00:00 GMT")
        );
        assert_eq!(
            requests[0].header("if-unmodified-since"),
            Some("Fri, 01 Jan 2021 00:00:00 GMT")
        );
        assert_eq!(requests[1].header("if-modified-since"), None);

        let options = DeleteBlobsOptions::new().with_if_modified_since(call);
        let (requests, _) = build(blobs, &options);
        for r in &requests {
            assert_eq!(
                r.header("if-modified-since"),
                Some("Fri, 04 Mar 2022 05:06:07 GMT")
            );
        }
        assert_eq!(
            requests[0].header("if-unmodified-since"),
            Some("Fri, 01 Jan 2021 00:00:00 GMT")
        );
        assert_eq!(requests[1].header("if-unmodified-since"), None);
    }

    #[test]
    fn etag_defaults_to_if_not_modified() {
        let blobs = vec![
            BlobProperties::new("a").with_etag("\"0x8D93C7D4629C227\"").into(),
            BlobProperties::new("b")
                .with_etag("\"0x1\"")
                .with_match_condition(MatchConditions::IfModified)
                .into(),
            BlobProperties::new("c")
                .with_match_condition(MatchConditions::IfPresent)
                .into(),
        ];
        let (requests, _) = build(blobs, &DeleteBlobsOptions::default());

        assert_eq!(requests[0].header("if-match"), Some("\"0x8D93C7D4629C227\""));
        assert_eq!(requests[0].header("if-none-match"), None);

        assert_eq!(requests[1].header("if-match"), None);
        assert_eq!(requests[1].header("if-none-match"), Some("\"0x1\""));

        // a match condition is ignored without an etag
        assert_eq!(requests[2].header("if-match"), None);
        assert_eq!(requests[2].header("if-none-match"), None);
    }

    #[test]
    fn item_only_fields() {
        let blobs = vec![BlobProperties::new("dir/my blob")
            .with_version_id("2021-06-01T00:00:00.0000000Z")
            .with_lease_id("lease-1")
            .with_if_tags_match_condition("\"tag\" = 'x'")
            .with_timeout(20)
            .into()];
        let (requests, _) = build(blobs, &DeleteBlobsOptions::default());
        let r = &requests[0];

        assert_eq!(r.path(), "/mycontainer/dir/my%20blob?sv=2020&sig=abc");
        assert_eq!(
            r.query_param("versionid"),
            Some("2021-06-01T00:00:00.0000000Z")
        );
        assert_eq!(r.query_param("timeout"), Some("20"));
        assert_eq!(r.query_param("snapshot"), None);
        assert_eq!(r.header("x-ms-lease-id"), Some("lease-1"));
        assert_eq!(r.header("x-ms-if-tags"), Some("\"tag\" = 'x'"));
    }

    #[test]
    fn call_level_tags_and_timeout() {
        let options = DeleteBlobsOptions::new()
            .with_if_tags_match_condition("a = 'b'")
            .with_timeout(5)
            .with_raise_on_any_failure(false);
        let blobs = vec![
            BlobProperties::new("x")
                .with_if_tags_match_condition("c = 'd'")
                .with_timeout(60)
                .into(),
            "y".into(),
        ];
        let (requests, batch) = build(blobs, &options);

        assert_eq!(requests[0].header("x-ms-if-tags"), Some("a = 'b'"));
        assert_eq!(requests[0].query_param("timeout"), Some("5"));
        assert_eq!(requests[1].header("x-ms-if-tags"), Some("a = 'b'"));
        assert_eq!(requests[1].query_param("timeout"), None);

        assert!(!batch.raise_on_any_failure);
        assert_eq!(batch.timeout, "&timeout=5");
    }

    #[test]
    fn empty_call_level_values_fall_back() {
        let options = DeleteBlobsOptions::new()
            .with_timeout(0)
            .with_if_tags_match_condition("");
        let blobs = vec![
            BlobProperties::new("x")
                .with_if_tags_match_condition("c = 'd'")
                .with_timeout(60)
                .into(),
            "y".into(),
        ];
        let (requests, batch) = build(blobs, &options);

        assert_eq!(requests[0].query_param("timeout"), Some("60"));
        assert_eq!(requests[0].header("x-ms-if-tags"), Some("c = 'd'"));
        assert_eq!(requests[1].query_param("timeout"), None);
        assert_eq!(requests[1].header("x-ms-if-tags"), None);
        assert_eq!(batch.timeout, "");
    }

    #[derive(Debug)]
    struct RejectingSerializer;

    impl RequestSerializer for RejectingSerializer {
        fn query(&self, name: &str, _: SerializeValue<'_>, _: Constraints) -> Result<String> {
            Err(Error::InvalidArgument {
                name: name.to_string(),
                reason: "rejected".to_string(),
            })
        }

        fn header(&self, _: &str, value: SerializeValue<'_>) -> Result<String> {
            DefaultSerializer.header("", value)
        }
    }

    #[test]
    fn serializer_errors_abort_the_batch() {
        let blobs: Vec<BlobItem> =
            vec!["a".into(), BlobProperties::new("b").with_snapshot("s").into()];
        let err = generate_delete_blobs_requests(
            "",
            "c",
            &RejectingSerializer,
            blobs,
            &DeleteBlobsOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for 'snapshot': rejected");
    }
}
