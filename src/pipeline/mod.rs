//! Pipeline stages for map-reduce PDF summarisation.
//!
//! Each submodule implements exactly one step; [`crate::summarize`] wires
//! them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ map ──▶ reduce
//! (path/URL) (pdfium)   (chat per page) (chat once)
//! ```
//!
//! 1. [`input`]  : turn a path, URL or uploaded bytes into a local PDF file
//! 2. [`extract`]: read the text of the selected pages; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`map`]    : one chat call per page, in page order
//! 4. [`reduce`] : one chat call over the joined page summaries
//!
//! [`chat`] is the network seam shared by map and reduce.

pub mod chat;
pub mod extract;
pub mod input;
pub mod map;
pub mod reduce;
