pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod grade;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod remote;
pub mod report;
pub mod util;
