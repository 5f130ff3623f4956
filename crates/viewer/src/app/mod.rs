pub(crate) mod bootstrap;
mod config;
mod demo_feed;
pub(crate) mod loop_runner;
mod presenter;
