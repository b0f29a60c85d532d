//! Provider gateway adapters.

mod replay;

pub use replay::{write_replay_cache, ReplayGateway};
