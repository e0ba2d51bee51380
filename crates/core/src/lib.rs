pub mod color;
pub mod debug;
pub mod logger;
pub mod monitor;
pub mod platform;
pub mod sampler;
pub mod settings;
pub mod sleep;
pub mod types;
