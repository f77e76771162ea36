pub mod config;
pub mod identity;
pub mod log;
pub mod run;
pub mod stats;
pub mod timer;
