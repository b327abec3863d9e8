//! CLI command handlers, one file per command.

mod add;
mod cancel;
mod checksum;
mod remove;
mod retry;
mod run;
mod status;

pub use add::run_add;
pub use cancel::run_cancel;
pub use checksum::run_checksum;
pub use remove::run_remove;
pub use retry::run_retry;
pub use run::run_dispatcher;
pub use status::run_status;
