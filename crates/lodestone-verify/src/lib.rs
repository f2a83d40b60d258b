//! # lodestone-verify: RBAC aggregation consistency verification
//!
//! Answers whether a cluster currently reflects the RBAC state implied
//! by declared role templates and bindings, under eventual consistency.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Verifier                                     │
//! │  ├─ expectation (lodestone-rbac)              │
//! │  ├─ observation (ClusterApi)                  │
//! │  └─ bounded retry (poll_until)                │
//! └─────────────────┬────────────────────────────┘
//!                   │
//!                   ▼
//!   Ok | NotFound | RuleMismatch | BindingMismatch
//!      | Timeout  | Unsupported
//! ```
//!
//! ## Example
//!
//! ```no_run
//! # fn example<C: lodestone_verify::ClusterApi>(api: C) -> lodestone_verify::Result<()> {
//! use lodestone_types::{PolicyRule, RoleTemplate, Scope, TemplateContext};
//! use lodestone_verify::Verifier;
//!
//! let verifier = Verifier::new(api);
//! let main = RoleTemplate::new(
//!     "project-owner",
//!     TemplateContext::Cluster,
//!     vec![PolicyRule::new(
//!         ["get", "list"],
//!         ["management.cattle.io"],
//!         ["projects"],
//!     )],
//! );
//! verifier.verify_main_acr(&Scope::Local, &main, &[])?;
//! verifier.verify_cluster_mgmt_acr(&Scope::Local, &main, &[])?;
//! # Ok(())
//! # }
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod poll;
pub mod verifier;

// Re-export commonly used types
pub use cluster::{ApiError, ClusterApi};
pub use config::{ConfigLoader, PollProfile, VerifyConfig};
pub use error::{Result, VerifyError};
pub use poll::{PollConfig, poll_until};
pub use verifier::Verifier;
