//! Bounded sample history and the Live/Paused view over it.

mod store;
mod view;

pub use store::{WindowEntry, WindowStore, HISTORY_FACTOR};
pub use view::ViewState;
