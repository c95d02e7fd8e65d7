// src/engine/mod.rs
//
// The behavioral core of the platform: question shuffling, the timed attempt
// session, durable session snapshots, score computation and leaderboard
// aggregation. Everything here is synchronous and side-effect free except
// the session store, which only touches the local filesystem.

pub mod ranking;
pub mod score;
pub mod session;
pub mod shuffle;
pub mod store;
