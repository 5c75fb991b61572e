pub mod config;
pub mod entities;
pub mod http_client;
pub mod optimizer;
pub mod ownership;
pub mod pipeline;
pub mod provider;
pub mod snapshot;
