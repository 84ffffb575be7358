//! Flat list of sources that permanently failed, kept for targeted reruns.
//!
//! The file is plain text, one entry per line:
//!
//! ```text
//! /srv/hls/failed/clip.mp4 | Failed to probe media file: no video stream | 2026-10-18T09:12:44Z
//! ```
//!
//! A line holding only a path is accepted too (that is what a prune rewrite
//! produces). Reasons are flattened to one line and stripped of the `|`
//! delimiter before writing.

mod list;
mod types;

pub use list::FailedList;
pub use types::{sanitize_reason, FailedListEntry, FailedListError, FIELD_SEPARATOR};
