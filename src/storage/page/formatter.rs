//! Formatting of freshly appended blocks.

use super::Page;

/// Initializes the contents of a page before it is appended as a new block.
///
/// Any `Fn(&mut Page)` closure is a formatter.
pub trait PageFormatter {
    fn format(&self, page: &mut Page);
}

/// Formatter that leaves the page zero-filled.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroFormatter;

impl PageFormatter for ZeroFormatter {
    fn format(&self, page: &mut Page) {
        page.reset();
    }
}

impl<F> PageFormatter for F
where
    F: Fn(&mut Page),
{
    fn format(&self, page: &mut Page) {
        self(page)
    }
}
