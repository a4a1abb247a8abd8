pub mod config;
pub mod context;
pub mod error;
pub mod interactive;
pub mod logging;
pub mod media;
pub mod pipeline;
pub mod silence;
pub mod split;

pub use config::Config;
pub use context::RunContext;
pub use error::{Result, SplitError};
pub use pipeline::{
    detect_silences, print_summary, split_by_silence, PipelineConfig, PipelineResult,
    PipelineStats,
};
