//! Hybrid Data Layer and the circuit breaker that guards its stores.

pub mod circuit_breaker;
pub mod hybrid;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
pub use hybrid::{
    DataLayerError, EntityType, HybridDataLayer, InMemoryStore, KeyValueStore, Store, SyncOp,
    SyncPolicy, SyncPriority, SyncTask, TransactionMode,
};
