use thiserror::Error;

/// Failures the cache surfaces to callers. A missing or unparseable
/// *persisted* index is recovered internally by starting from an empty
/// catalog; everything here stops the resolution.
///
/// There's no retry policy anywhere in this crate. A transient failure means
/// the caller re-invokes `resolve`.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No path was ever configured to persist the extract index to.
    #[error("no destination to save the extract index; configure a path or pass one to save()")]
    MissingDestination,
    /// Neither the local index nor the download catalog has an extent
    /// covering the requested region.
    #[error("no extract covers the requested region")]
    NoCoverageFound,
    /// The external crop tool failed, or couldn't be launched at all. Carries
    /// the tool's diagnostic output; a silently-failed crop would leave a
    /// record pointing at a truncated file.
    #[error("cropping failed: {output}")]
    CropFailed { output: String },
    /// A catalog file exists but isn't a usable feature collection.
    #[error("malformed catalog {path}: {message}")]
    MalformedCatalog { path: String, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
