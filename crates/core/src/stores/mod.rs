pub mod meilisearch;

pub use meilisearch::MeiliClient;
