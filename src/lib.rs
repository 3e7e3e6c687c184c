//! trackwire - a client core for hosted issue trackers.
//!
//! Provides the discipline needed to talk to a tracker's REST API safely
//! and repeatably: credential handling, session management with
//! single-flight refresh, request execution with classified errors and
//! bounded retries, issue CRUD, and change polling with at-most-once
//! transition events.
//!
//! # Example
//!
//! ```no_run
//! use trackwire::{Credentials, AuthMode, IssueDraft, IssueRepository, Settings};
//!
//! # async fn run() -> Result<(), trackwire::ApiError> {
//! let credentials = Credentials::new(
//!     "https://tracker.example.net",
//!     "user@example.com",
//!     "api-token",
//!     AuthMode::Basic,
//!     Some("ABC".to_string()),
//! ).expect("valid credentials");
//!
//! let repo = IssueRepository::connect(credentials, &Settings::default())?;
//! let issue = repo.create(IssueDraft::new("New Task", "ABC")).await?;
//! println!("created {}", issue.key);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod issues;
pub mod logging;
pub mod monitor;

pub use api::error::ApiError;
pub use api::executor::{RequestExecutor, RetryConfig};
pub use api::session::SessionManager;
pub use api::transport::{HttpTransport, Method, Transport};
pub use api::types::{CurrentUser, FieldPatch, Issue, IssueDraft, IssueFields};
pub use config::{AuthMode, Config, ConfigError, Credentials, Settings};
pub use error::{Error, Result};
pub use issues::IssueRepository;
pub use monitor::{ActivityEvent, ActivityMonitor};
