//! Flowspec Test Runner
//!
//! This crate executes declarative process specs against an orchestration
//! engine. It:
//! - Parses YAML spec documents into a closed, validated action/verification model
//! - Deploys the spec's resources before every test case
//! - Applies actions in order, tracking created instances by alias
//! - Polls the read model until each verification holds or times out
//! - Collects a diagnostic snapshot of every instance after each test case
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SpecRunner                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  run_spec(spec) -> TestSpecResult                           │
//! │    ├── engine.before_all()                                  │
//! │    ├── run_test_case(resources, case) -> TestResult  (each) │
//! │    │     ├── engine.before_each()                           │
//! │    │     ├── deploy resources (ResourceResolver)            │
//! │    │     ├── actions  ──► TestEngine + ContextRegistry      │
//! │    │     ├── verifications ──► poll ──► ReadModel           │
//! │    │     ├── collect TestOutput per context                 │
//! │    │     └── engine.after_each()                            │
//! │    └── engine.after_all()                                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod builder;
pub mod config;
pub mod context;
pub mod poll;
pub mod registry;
pub mod report;
pub mod resource;
pub mod runner;
pub mod spec;
pub mod verification;

pub use action::Action;
pub use builder::{TestCaseBuilder, TestSpecBuilder};
pub use config::{AdapterFailurePolicy, RunnerConfig};
pub use context::ContextRegistry;
pub use poll::{Clock, ManualClock, PollOutcome, PollPolicy, SystemClock};
pub use resource::{DirectoryResourceResolver, InMemoryResourceResolver, ResourceResolver};
pub use runner::{SpecRunner, TestOutput, TestResult, TestSpecResult};
pub use spec::{TestCase, TestSpec};
pub use verification::{Verification, VerificationResult};

pub use flowspec_common::{Error, Result};
