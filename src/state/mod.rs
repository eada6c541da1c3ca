//! View state owned by the root [`App`](crate::app::App).
//!
//! Nothing here performs I/O; every transition is a plain method call so the
//! state can be driven directly from tests.

mod detail;
mod drawer;
mod list;
mod selection;

pub use detail::{
    base_section, counter_section, generate_intent, BaseSection, CounterSection, DetailState,
    GenerateIntent, Section,
};
pub use drawer::{validate_source_url, AddSourceError, DrawerState};
pub use list::{entries, ListEntry, ListState, UNKNOWN_SOURCE};
pub use selection::{CurrentItem, SelectionState};
