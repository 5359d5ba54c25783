//! Treeprocess - build per-environment output trees from templated sources.
//!
//! This library provides the core functionality for treeprocess, including:
//! - Flattening nested JSON build configs into output path to source mappings
//! - Loading a base config plus one overlay per environment
//! - Expanding glob source expressions into concrete items
//! - Running each item through preprocess, post-process and persist stages
//!
//! # Example
//!
//! ```no_run
//! use treeprocess::build::BuildContext;
//!
//! let report = BuildContext::new("src/templates", "output", "config")
//!     .with_jobs(Some(4))
//!     .run()
//!     .unwrap();
//!
//! println!("{}", report.render());
//! ```

pub mod adapters;
pub mod build;
pub mod context;
pub mod error;
pub mod expand;
pub mod pipeline;
pub mod settings;

pub use error::{FailureKind, Result, TreeprocessError};
