pub mod browser;
pub mod event;

pub use browser::{Browser, Mode, Row};
pub use event::{BrowserAction, BrowserEvent, type_for_key};
