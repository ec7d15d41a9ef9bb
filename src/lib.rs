pub mod binance;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod feed;
pub mod history;
pub mod indicator;
pub mod model;
pub mod session;
