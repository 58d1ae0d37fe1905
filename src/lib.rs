// Library surface for headless/integration tests and reuse.
// The terminal front end lives in main.rs and only drives `App`.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod corpus;
pub mod error;
pub mod history;
pub mod logging;
pub mod render;
pub mod runtime;
pub mod scorer;
pub mod session;
pub mod ui;

pub use app::App;
pub use corpus::Difficulty;
pub use session::{Session, SessionState, TestResult};
