mod models;
mod store;

pub use models::{keys, GuildSettings};
pub use store::SettingsStore;
