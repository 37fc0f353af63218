mod handlers;
mod models;
mod state;
mod translate;

pub use handlers::{router, run_server};
