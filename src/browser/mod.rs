//! 浏览器生命周期：连接已打开的浏览器或启动无头浏览器，为每个作业打开标签页

pub mod connection;
pub mod headless;

pub use connection::{connect_to_browser, open_job_page};
pub use headless::launch_headless_browser;
