pub mod api;
pub mod config;
pub mod repl;
pub mod schema;
pub mod session;
pub mod util;
