//! CLI commands module.

mod identity;
mod maintenance;
mod util;

pub use identity::{DeleteCommand, ListCommand, ShowCommand};
pub use maintenance::{GroupsCommand, StatsCommand, VerifyCommand};

pub(crate) use util::*;
