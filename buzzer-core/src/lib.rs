pub mod cache;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod models;
pub mod pool;
pub mod stats;
pub mod store;

pub use cache::{CacheConfig, CacheMetrics, ReadCache};
pub use error::{GatewayError, Result, StoreError};
pub use gateway::{CommentaryService, GatewayConfig, GatewayHealth, QueryGateway};
pub use memory::{MemoryDb, MemoryManager};
pub use pool::{ConnectionManager, Pool, PoolConfig, PoolError, PoolStatus, PooledConnection};
pub use stats::{EventCount, StatsAggregator, StatsCounts};
pub use store::CommentaryStore;
