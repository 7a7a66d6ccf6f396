pub mod dom_scripts;
pub mod js_executor;
pub mod session;

pub use js_executor::JsExecutor;
pub use session::{BrowserSession, PageSession};
