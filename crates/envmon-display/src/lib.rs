//! Page presentation for the envmon display
//!
//! A page is described as data first ([`PageDescriptor`]) and only then
//! drawn by a [`DisplaySink`], so the descriptors can be tested without a
//! screen.

pub mod console;
pub mod page;
pub mod rotation;

pub use console::*;
pub use page::*;
pub use rotation::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DisplayResult<T> = Result<T, DisplayError>;

/// Something that can show one page at a time
pub trait DisplaySink: Send {
    fn render(&mut self, page: &PageDescriptor) -> DisplayResult<()>;

    /// Blank the screen
    fn clear(&mut self) -> DisplayResult<()>;
}
