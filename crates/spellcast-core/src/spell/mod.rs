//! Spell definitions: the data model and the built-in catalog.

pub mod builtin;
pub mod model;

pub use builtin::{builtin_spells, is_builtin, materialize_scripts, BUILTIN_IDS, DEFAULT_QUICK_SLOTS};
pub use model::{
    slot_index, timeout_from_ms, OutputFormat, ScriptSource, Spell, SpellDraft, SpellPatch,
    SpellRecord, QUICK_SLOT_COUNT,
};
