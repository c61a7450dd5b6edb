// Library interface for newsdraft modules
// This allows tests and the binary to import modules

pub mod drafts;
pub mod extract;
pub mod llm;
pub mod news;
pub mod notify;
pub mod report;
pub mod scheduler;
pub mod workflow;
