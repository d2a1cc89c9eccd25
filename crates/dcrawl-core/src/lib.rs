pub mod config;
pub mod logging;

pub mod control;
pub mod coordinator;
pub mod fetch;
pub mod links;
pub mod lock;
pub mod naming;
pub mod partition;
pub mod pool;
pub mod progress;
pub mod retry;
pub mod rows;
pub mod session;
pub mod stats;
pub mod storage;
pub mod task;
pub mod worker;
