mod bus;
mod host;

pub use bus::{EventBus, DEFAULT_QUEUE_CAPACITY};
pub use host::{PluginHost, PluginInfo, PluginMeta};
