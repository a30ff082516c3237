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

#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

//! # blob_batch
//!
//! Helpers for talking to [Azure Blob Storage] that do not perform any I/O:
//!
//! * [`parse_account_url`] and [`parse_container_url`] normalize a user supplied
//!   endpoint and split off any SAS token and snapshot carried in its query
//! * [`generate_delete_blobs_requests`] and [`generate_set_tier_requests`] shape
//!   the sub-requests of a [blob batch], together with the [`BatchOptions`]
//!   needed to address the batch itself
//!
//! Sending the batch, authenticating it and parsing the multipart response
//! are left to the caller.
//!
//! # Example
//!
//! ```
//! # use blob_batch::{
//! #     generate_set_tier_requests, parse_container_url, BlobItem, BlobProperties, BlobTier,
//! #     DefaultSerializer, SetTierOptions,
//! # };
//! let parsed = parse_container_url(
//!     "https://account.blob.core.windows.net/?sv=2021-08-06&sig=c2ln",
//!     "photos",
//! )
//! .unwrap();
//! let query = format!("?{}", parsed.sas_token().unwrap());
//!
//! let blobs = vec![
//!     BlobItem::from("2023/beach.jpg"),
//!     BlobProperties::new("2023/dunes.jpg")
//!         .with_blob_tier(BlobTier::Cold)
//!         .into(),
//! ];
//! let (requests, options) = generate_set_tier_requests(
//!     &query,
//!     "photos",
//!     Some(&BlobTier::Archive),
//!     &DefaultSerializer,
//!     blobs,
//!     &SetTierOptions::new(),
//! )
//! .unwrap();
//!
//! // The call-level tier overrides the tier carried by an item
//! assert_eq!(requests.len(), 2);
//! assert_eq!(requests[1].header("x-ms-access-tier"), Some("Archive"));
//! assert_eq!(
//!     options.batch_url(parsed.scheme(), parsed.host()),
//!     "https://account.blob.core.windows.net/photos?restype=container&comp=batch&sv=2021-08-06&sig=c2ln"
//! );
//! ```
//!
//! [Azure Blob Storage]: https://azure.microsoft.com/en-gb/services/storage/blobs/
//! [blob batch]: https://learn.microsoft.com/en-us/rest/api/storageservices/blob-batch

pub mod batch;
pub mod config;
pub mod endpoint;
pub mod request;
pub mod serialize;
mod util;

pub use batch::{
    generate_delete_blobs_requests, generate_set_tier_requests, BlobItem, BlobProperties,
    BlobTier, DeleteBlobsOptions, DeleteSnapshots, MatchConditions, RehydratePriority,
    SetTierOptions,
};
pub use config::BatchConfigKey;
pub use endpoint::{
    format_container_url, parse_account_url, parse_account_url_bytes, parse_container_url,
    parse_container_url_bytes, ParsedUrl, SasToken,
};
pub use request::{BatchOptions, SubRequest};
pub use serialize::{Constraints, DefaultSerializer, RequestSerializer, SerializeValue};

/// A specialized `Result` for blob batch errors
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A specialized `Error` for blob batch errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum Error {
    #[error("{kind} URL must be a string.")]
    UrlNotString { kind: &'static str },

    #[error("Unable parse source url. Url: {}, Error: {}", url, source)]
    UnableToParseUrl {
        source: url::ParseError,
        url: String,
    },

    #[error("Invalid URL: {}", url)]
    InvalidUrl { url: String },

    #[error("Please specify a container name.")]
    MissingContainerName,

    #[error("A blob tier must be specified")]
    MissingBlobTier,

    #[error("Snapshot and version_id cannot be set at the same time")]
    SnapshotAndVersionId { name: String },

    #[error("Invalid value for '{}': {}", name, reason)]
    InvalidArgument { name: String, reason: String },

    #[error("Invalid value for header '{}': {}", name, source)]
    InvalidHeaderValue {
        name: String,
        source: http::header::InvalidHeaderValue,
    },

    #[error("Unable to build request: {}", source)]
    InvalidRequest { source: http::Error },

    #[error("Configuration key: '{}' is not known.", key)]
    UnknownConfigurationKey { key: String },

    #[error("Configuration key: '{}' does not apply to {}.", key, operation)]
    UnsupportedConfigurationKey {
        key: String,
        operation: &'static str,
    },

    #[error("Invalid value '{}' for configuration key '{}'", value, key)]
    InvalidConfigValue { key: String, value: String },
}

impl Error {
    /// Returns true if this error was caused by invalid input
    pub fn is_invalid_argument(&self) -> bool {
        match self {
            Self::UrlNotString { .. }
            | Self::UnableToParseUrl { .. }
            | Self::InvalidUrl { .. }
            | Self::MissingContainerName
            | Self::MissingBlobTier
            | Self::SnapshotAndVersionId { .. }
            | Self::InvalidArgument { .. }
            | Self::InvalidHeaderValue { .. }
            | Self::InvalidRequest { .. }
            | Self::UnknownConfigurationKey { .. }
            | Self::UnsupportedConfigurationKey { .. }
            | Self::InvalidConfigValue { .. } => true,
        }
    }
}
