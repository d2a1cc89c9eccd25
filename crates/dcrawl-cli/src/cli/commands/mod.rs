//! CLI command handlers, one file per command.

mod clean_locks;
mod probe;
mod run;
mod session;
mod worker;

pub use clean_locks::run_clean_locks;
pub use probe::run_probe;
pub use run::run_batches;
pub use session::{run_check_session, run_set_session};
pub use worker::run_worker_process;
