pub mod analysis;
pub mod dedup;
pub mod fetcher;
pub mod orchestrator;
pub mod parse;
pub mod pipeline;
pub mod platforms;
pub mod progress;
pub mod queue;
pub mod resolver;
pub mod server;
pub mod store;
