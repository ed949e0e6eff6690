#![warn(missing_docs)]

//! A command-tree dispatcher in the style of Minecraft server commands.
//!
//! A [`CommandBase`] owns a tree of [`Node`]s (literal keywords and typed dynamic arguments).
//! [`CommandBase::execute`] resolves a tokenized line to exactly one executor, and
//! [`CommandBase::suggest`] produces tab-completion candidates for a partially typed line.
//! Failures are reported to the sender through pluggable notifiers rather than returned as
//! errors.

mod arg;
mod base;
mod context;
mod error;
mod module;
mod node;
mod notify;

/// The error type produced when an argument cannot be parsed. This is subject to change in the
/// future.
pub type Error = String;

pub use arg::*;
pub use base::*;
pub use context::*;
pub use error::*;
pub use module::*;
pub use node::*;
pub use notify::*;
pub use quartz_dispatch_macros::FromArgument;
