pub mod archive_fetch;
pub mod config;
pub mod country;
pub mod country_names;
pub mod error;
pub mod export;
pub mod http_client;
pub mod input;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod state;
