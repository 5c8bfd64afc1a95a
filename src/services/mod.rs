//! Service layer: stores, caching, the scoring client and the engine orchestration.

pub mod cache;
pub mod conflict_service;
pub mod memory_store;
pub mod pg_store;
pub mod scoring_client;

pub use cache::RedisCache;
pub use conflict_service::ConflictService;
pub use memory_store::InMemoryStore;
pub use pg_store::PgSchedulingStore;
pub use scoring_client::ScoringClient;
