//! Browser automation layer
//!
//! - `session`: lifecycle of one Chrome session with anti-detection settings
//! - `owner`: the task that owns a session and serializes every job on it
//! - `resolver`: ordered multi-strategy element lookup
//! - `locator`: declarative locator strategies and targets
//! - `humanize`: injectable delay and typing policy
//! - `driver` / `webdriver`: driver abstraction and its fantoccini backend
//! - `testing`: in-memory driver for tests

pub mod driver;
pub mod humanize;
pub mod locator;
pub mod owner;
pub mod resolver;
pub mod session;
#[cfg(test)]
pub mod testing;
pub mod webdriver;

pub use driver::{Driver, ElementId};
pub use humanize::{DelayRange, HumanPacing};
pub use locator::{By, Locator, LocatorTarget, Requirement};
pub use owner::{SessionHandle, SessionSnapshot};
pub use resolver::{ElementResolver, ResolvedElement};
pub use session::{Session, SessionManager, SessionState};
