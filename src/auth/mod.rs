//! Authentication module
//!
//! The platform uses session authentication: `Login.json` exchanges the
//! user name, password, organisation id and developer key for a session id.
//! Every later request carries the session id and developer key as form
//! fields next to its JSON `data`.

mod session;
mod types;

pub use session::{login, LOGIN_ENDPOINT};
pub use types::{Credentials, Session};
