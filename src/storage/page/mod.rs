//! Page types.
//!
//! This module contains:
//! - [`Page`] - The raw 4KB data container with typed accessors
//! - [`PageFormatter`] - Initializes pages destined for new blocks

mod formatter;
#[allow(clippy::module_inception)]
mod page;

pub use formatter::{PageFormatter, ZeroFormatter};
pub use page::Page;
