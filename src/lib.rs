//! Secure deletion: overwrite file contents with one or more patterns,
//! optionally verify and rename, then unlink, producing one report row per
//! filesystem object touched.
//!
//! Overwriting in place only helps on media that rewrite sectors where they
//! stand. SSDs and other wear-levelled flash may keep stale copies that no
//! file-level pass can reach.

pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod method;
pub mod overwrite;
pub mod rename;
pub mod report;

pub use cancel::CancelToken;
pub use config::WipeConfig;
pub use engine::{NoopObserver, Shredder, Target, TargetStatus, WipeObserver, plan_targets};
pub use error::{Result, WipeError};
pub use method::{PassPattern, WipeMethod};
pub use report::{ReportRow, RunSummary, Verification, WipeResult};
