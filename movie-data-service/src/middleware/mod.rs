pub mod session;

pub use session::{CurrentUser, SESSION_COOKIE, SESSION_HEADER};
