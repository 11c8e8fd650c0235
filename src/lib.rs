//! Replay ingestion for the pirates game visualizer.
//!
//! Replays arrive either as JSON or as the older line-oriented text format.
//! Both are brought into one canonical structure, validated into a
//! [`ReplayDocument`], and then materialized turn by turn into per-entity
//! [`AnimationTrack`]s that a renderer samples with
//! [`AnimationTrack::interpolate`].
//!
//! ```no_run
//! use pirates_replay::{Replay, ReplayOptions};
//!
//! # fn main() -> pirates_replay::ReplayResult<()> {
//! let text = std::fs::read_to_string("game.replay").unwrap();
//! let mut replay = Replay::load(&text, &ReplayOptions::default())?;
//! for id in replay.get_turn(0)?.iter() {
//!     let snapshot = replay.interpolate(*id, 0.5);
//!     println!("{id}: {snapshot:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod constants;
mod decoder;
mod document;
mod error;
mod keyframe;
mod legacy;
mod materializer;
mod order;
mod replay;
mod tokenizer;
mod util;
mod validator;


pub use crate::constants::*;
pub use crate::decoder::*;
pub use crate::document::*;
pub use crate::error::*;
pub use crate::keyframe::*;
pub use crate::legacy::*;
pub use crate::materializer::*;
pub use crate::order::*;
pub use crate::replay::*;
pub use crate::tokenizer::*;
pub use crate::util::*;
pub use crate::validator::*;

#[macro_use]
extern crate derive_new;
