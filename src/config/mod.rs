// Re-export all items from the submodules
mod collection_config;
mod collection_methods;

// Re-export collection methods
pub use collection_methods::{CollectionMethod, CollectionMethodSet};

// Re-export collector config
pub use collection_config::{load_or_create_config, CollectionFlags, CollectorConfig};
