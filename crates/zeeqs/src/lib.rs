//! ZeeQS read model for Flowspec
//!
//! Answers the runner's state queries by sending GraphQL queries to a ZeeQS
//! service that indexes the exported records of a Zeebe broker.
//!
//! ```text
//! ┌──────────────┐  POST /graphql  ┌──────────────┐   exporter   ┌────────┐
//! │ ZeeqsClient  │ ──────────────► │    ZeeQS     │ ◄─────────── │ Zeebe  │
//! │ (ReadModel)  │ ◄────────────── │              │              │        │
//! └──────────────┘   JSON result   └──────────────┘              └────────┘
//! ```

pub mod client;
mod dto;

pub use client::{ZeeqsClient, ZeeqsConfig};
