//! # hokm_core
//!
//! Room coordination and rule engine for the Hokm card game: a four-player,
//! two-team trick-taking game played over a persistent WebSocket connection.
//!
//! ## Core Modules
//!
//! - [`game`]: The pure rule engine — card/suit/seat primitives, the
//!   authoritative per-room [`game::GameState`], and the operations that
//!   validate and apply moves against it.
//! - [`room`]: The Room Coordinator — the actor that owns one room's
//!   [`game::GameState`], serializes concurrent client requests against it,
//!   and drives persistence and broadcast.
//! - [`data`]: The Hybrid Data Layer and Circuit Breaker that sit between the
//!   Room Coordinator and the hot/cold stores.
//! - [`auth`]: Password authentication and session/JWT issuance.
//! - [`net`]: The wire protocol shared between server and clients.
//! - [`security`]: Rate limiting for auth and chat endpoints.
//! - [`db`]: Cold-store (PostgreSQL) connection pool and repositories.
//! - [`proxy`]: The Edge Proxy — backend health checks, connection
//!   forwarding, and live migration on backend failure.

/// Card, suit, and seat primitives, and the pure rule engine.
pub mod game;

/// Wire protocol shared between server and clients.
pub mod net;

/// Room Coordinator: the per-room actor and its handle.
pub mod room;

/// Hybrid Data Layer and Circuit Breaker.
pub mod data;

/// Password authentication, sessions, and JWTs.
pub mod auth;

/// Rate limiting for auth and chat endpoints.
pub mod security;

/// Cold-store connection pool and repositories.
pub mod db;

/// Edge Proxy: backend health checks, forwarding, and failover migration.
pub mod proxy;
