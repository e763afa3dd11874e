pub mod admission;
pub mod config;
pub mod http;
pub mod identity;
pub mod lexicon;
pub mod memory;
pub mod model;
pub mod orchestrator;
pub mod similarity;
pub mod types;
