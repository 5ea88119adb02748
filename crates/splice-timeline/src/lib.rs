//! Splice Timeline - Timeline data model
//!
//! Implements the multi-track timeline the engine plays back:
//! - Tracks containing freely placed clips
//! - Edit operations as pure value transformations
//! - Snapshot undo/redo history
//! - Active-clip resolution at an arbitrary time

pub mod clip;
pub mod edit;
pub mod history;
pub mod resolve;
pub mod timeline;
pub mod track;

pub use clip::{Clip, ClipId};
pub use edit::{Applied, ClipField, EditCommand, EditError, TrimEdge};
pub use history::History;
pub use resolve::{resolve, ActiveClips, ResolvedClip};
pub use timeline::Timeline;
pub use track::{Track, TrackId, TrackKind};
