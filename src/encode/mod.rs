//! Encoding sessions.
//!
//! A session consumes the rendered surface once per frame, in timeline order, and assembles the
//! final artifact when stopped.

/// `ffmpeg`-based session (WebM or MP4 via system `ffmpeg`).
pub mod ffmpeg;
/// Session trait, configuration, artifact and the in-memory session.
pub mod sink;
