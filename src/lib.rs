//! rigup - idempotent developer workstation provisioning
//!
//! This crate decides, per tool and host platform, whether installation is
//! needed, which package manager or command sequence to use, and verifies
//! the result. Re-running against an already-provisioned host performs no
//! mutating action.

pub mod audit;
pub mod config;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod platform;
pub mod pm;
pub mod process;
pub mod profile;
pub mod tools;

pub use config::{ExecutorConfig, PrivilegeMode, RetryPolicy};
pub use error::{FatalError, ToolError};
pub use executor::{Executor, InstallOutcome, InstallRequest, RunReport, StatusReporter};
pub use platform::Platform;
pub use tools::{Category, ToolCatalog, ToolSpec};
