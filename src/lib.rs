pub mod browser;
pub mod compact;
pub mod config;
pub mod error;
pub mod extractor;
pub mod flashscore;
pub mod http_client;
pub mod leagues;
pub mod logging;
pub mod model;
pub mod odds;
pub mod pipeline;
pub mod reconcile;
pub mod runs;
pub mod scheduler;
pub mod sheets;
pub mod valuation;
pub mod webdriver;
