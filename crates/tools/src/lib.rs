//! Homepage content tools
//!
//! Maintenance utilities for the site's content: translating the Chinese
//! reading list into the other site languages and cropping the avatar.

pub mod commands;
pub mod crop;
pub mod error;
pub mod translate;

pub use error::{Result, ToolError};
