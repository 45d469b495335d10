//! Data model shared by extraction, filling and injection.
//!
//! A template yields a [`StyleCatalog`] and a [`Blueprint`]; both are immutable
//! and cacheable per template. A slot filler produces request-scoped
//! [`FilledBlock`]s which the injector turns into an [`OutputContainer`].

mod block;
mod blueprint;
mod output;
mod style;

pub use block::{CellRef, FilledBlock};
pub use blueprint::{BlockKind, BlockSlot, Blueprint, TableDescriptor};
pub use output::OutputContainer;
pub use style::{StyleCatalog, StyleDescriptor, StyleFormatting, StyleKind};
