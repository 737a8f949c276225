// Core business logic module

pub mod config;
pub mod csv_sink;
pub mod sampler;

// Re-export commonly used items
pub use config::Config;
pub use csv_sink::CsvSink;
