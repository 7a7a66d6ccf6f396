pub mod llm_service;
pub mod report_writer;

pub use llm_service::LlmService;
pub use report_writer::ReportWriter;
