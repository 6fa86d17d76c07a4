mod settings;

pub use settings::{
    DatabaseConfig, FanoutConfig, NotifierConfig, OtelConfig, RenderConfig, ServerConfig,
    Settings, StoreConfig,
};
