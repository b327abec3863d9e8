pub mod config;
pub mod logging;

pub mod checksum;
pub mod control;
pub mod dispatcher;
pub mod fetch;
pub mod retry;
pub mod sink;
pub mod storage;
pub mod store;
pub mod url_model;
pub mod worker;
