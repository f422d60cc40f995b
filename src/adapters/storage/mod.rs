//! Subscription store adapters.

mod in_memory;
mod json_file;

pub use in_memory::InMemorySubscriptionStore;
pub use json_file::JsonFileSubscriptionStore;
