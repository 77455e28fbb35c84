//! `starbench` measures how long a command takes by running many copies of it
//! in parallel, each on its own worker slot, until a stop condition is met.
//!
//! ```no_run
//! use starbench::estimator::{CommandPerfEstimator, EstimatorConfig, StopAfterSingleRun};
//!
//! let config = EstimatorConfig::new(["ctest", "-L", "^arch4_quick$"])
//!     .cwd("/tmp/bench/worker<worker_id>/build")
//!     .stdout("/tmp/bench/worker<worker_id>/bench_stdout.txt")
//!     .parallelism(1, 4, 4);
//! let estimator = CommandPerfEstimator::new(config, Box::new(StopAfterSingleRun))?;
//! let stats = estimator.run()?;
//! println!("mean duration: {:.3} s", stats.mean());
//! # Ok::<(), starbench::StarbenchError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod estimator;
pub mod format;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod source;
pub mod util;

pub use error::{ErrorCode, Result, StarbenchError, StructuredError};
