mod differ;
mod github;
mod publisher;

pub use differ::{CompareFetchError, HttpPublishedSource, ManifestDiffer, PublishedSource};
pub use github::GithubContentStore;
pub use publisher::{DocumentStore, ManifestPublisher, PublishError, StoreDiagnostics};
