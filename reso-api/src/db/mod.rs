//! Query layer over the shared schema
//!
//! Functions that must run inside a caller's transaction take
//! `&mut SqliteConnection`; everything else takes the pool.

pub mod playlists;
pub mod profiles;
pub mod recommendations;
pub mod sessions;
pub mod songs;
pub mod users;
