//! Authenticated session collaborator.
//!
//! Workers never share live session state: the coordinator hands each
//! process the path of an [`AuthArtifact`] and every process builds its own
//! [`CookieSession`] from it.

mod artifact;
mod cookie;

use std::collections::HashMap;

pub use artifact::{parse_cookie_arg, ArtifactError, AuthArtifact, Cookie};
pub use cookie::CookieSession;

pub trait Session: Send {
    /// Whether requests made with `headers()` are authenticated.
    fn check_login(&mut self) -> bool;

    /// Re-establish the session. Returns whether it is usable afterwards.
    fn login(&mut self) -> bool;

    /// Headers to attach to every request (cookies).
    fn headers(&self) -> HashMap<String, String>;
}
