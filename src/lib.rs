// Infrastructure layer (shared components)
pub mod infrastructure;

pub use infrastructure::config;
pub use infrastructure::error;
pub use infrastructure::metrics;
pub use infrastructure::postgres;

// Domain layer
pub mod content;
pub mod fanout;
pub mod message;
pub mod notifier;
pub mod render;

// Application layer
pub mod api;
pub mod server;

// Supporting modules
pub mod telemetry;
