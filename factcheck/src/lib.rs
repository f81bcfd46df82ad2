// Library interface for factcheck modules
// This allows tests and the binary to import modules

pub mod credentials;
pub mod headlines;
pub mod llm;
pub mod pipeline;
pub mod search;
pub mod server;
pub mod synthesis;
pub mod verdict;

pub use credentials::Credentials;
pub use pipeline::FactChecker;
pub use verdict::{Verdict, VerdictResult};
