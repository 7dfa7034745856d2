//! Spell registry: the catalog of spells, the nine quick slots, spell-book
//! persistence, and what happens to a cast's output afterwards.

pub mod notify;
pub mod registry;
pub mod routing;
pub mod store;

pub use notify::{CastNotification, NotificationSink, NullSink};
pub use registry::{SpellRegistry, SpellRegistryBuilder};
pub use routing::{pretty_json, route_output, FileSharedText, MemorySharedText, SharedText, APPEND_SEPARATOR};
pub use store::{LoadedBook, SpellBookStore};
