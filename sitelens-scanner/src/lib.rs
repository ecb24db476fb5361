pub mod classify;
pub mod error;
pub mod fetcher;
pub mod metadata;
pub mod pool;
pub mod sitemap;

pub use classify::top_level_directory;
pub use error::ScanError;
pub use fetcher::{FailureKind, FetchFailure, FetchResult, HttpFetcher};
pub use metadata::{MetadataExtractor, PageMetadata};
pub use pool::{IndexedMetadata, MetadataFetcher, ProgressCallback};
pub use sitemap::{SitemapDocument, SitemapKind, parse_sitemap};
