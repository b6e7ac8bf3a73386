//! Client-side avatar systems
//!
//! Spawning and stepping avatars, rig playback, and the static world.

mod animation;
mod avatar;
mod world;

pub use animation::*;
pub use avatar::*;
pub use world::*;
