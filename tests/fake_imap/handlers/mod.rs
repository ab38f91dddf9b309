//! IMAP command handlers for the fake server.
//!
//! Each handler lives in its own module and processes a single IMAP
//! command. FETCH and UID FETCH share one handler.

mod fetch;
mod uid_copy;
mod uid_search;
mod uid_store;

pub use capability::handle_capability;
pub use expunge::handle_expunge;
pub use fetch::handle_fetch;
pub use idle::{handle_idle, idle_tag};
pub use list::handle_list;
pub use login::handle_login;
pub use logout::handle_logout;
pub use noop::handle_noop;
pub use select::handle_select;
pub use uid_copy::handle_uid_copy;
pub use uid_search::handle_uid_search;
pub use uid_store::{StoreArgs, handle_uid_store};
