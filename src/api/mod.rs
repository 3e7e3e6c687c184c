//! Tracker API client core.
//!
//! Layers, bottom up: [`transport`] is the wire seam, [`session`] turns
//! credentials into authorization headers, [`executor`] sends requests
//! under one retry and classification policy, and [`types`] is the
//! normalized wire model.

pub mod error;
pub mod executor;
pub mod session;
pub mod transport;
pub mod types;

pub use error::ApiError;
pub use executor::{RequestExecutor, RetryConfig};
pub use session::{Session, SessionManager};
pub use transport::{HttpTransport, Method, Transport};
pub use types::{CurrentUser, FieldPatch, Issue, IssueDraft, IssueFields};
