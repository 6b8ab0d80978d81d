//! Local web shell: header, footer, the evaluation form and the result view.

pub mod context;
pub mod error;
pub mod handlers;
pub mod pages;
pub mod router;
pub mod server;

pub use context::{ShellContext, ShellSession};
pub use error::ShellError;
pub use router::build_shell_router;
pub use server::{start_shell_server, ShellServer};
