//! # contract: the seam between traversal and transport
//!
//! The finder decides *what* to send; a [`RepositoryLoader`] decides *how*.
//! The HTTP implementation lives in the `resource-import` crate, tests use the
//! `mockall`-generated `MockRepositoryLoader` or a recording loader.
//!
//! Both methods report success as a plain `bool`. A loader must never fail the
//! traversal: transport and protocol errors are logged by the implementor and
//! turned into `false`.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::payload::{ResourceIdentifier, UploadPayload};

/// Issues create and patch requests against a repository.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositoryLoader: Send + Sync {
    /// Create (PUT) the resource at `identifier`.
    ///
    /// The content type is the payload's own, or `text/turtle` when it has none.
    /// Returns true iff the repository answered `201 Created`.
    async fn create(&self, identifier: ResourceIdentifier, payload: UploadPayload) -> bool;

    /// Apply a SPARQL update (PATCH) to the resource at `identifier`.
    ///
    /// Returns true iff the repository answered `204 No Content`.
    async fn patch(&self, identifier: ResourceIdentifier, payload: UploadPayload) -> bool;
}
