//! Generation sessions: options, collaborator hooks and the single-flight generator.

pub(crate) mod generator;
pub(crate) mod hooks;
pub(crate) mod options;
