// Library interface for pushdigest modules
// This allows tests and the binary to import modules

pub mod factory;
pub mod llm;
pub mod notifier;
pub mod pipeline;
pub mod scraping;
pub mod server;
pub mod summarizer;
pub mod transform;
pub mod translator;
