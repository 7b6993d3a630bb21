pub mod assemblyai_client;

pub use assemblyai_client::{AssemblyAiClient, AssemblyAiError};
