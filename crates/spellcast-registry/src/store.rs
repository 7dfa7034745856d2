//! Spell-book persistence.
//!
//! On-disk shape: `{ "spells": Spell[], "quickSlots": (Spell|null)[9] }`.
//! Slots are written as full spell values refreshed from the live catalog;
//! on load only each slot entry's `id` is kept and resolved by the registry.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use spellcast_core::spell::{is_builtin, Spell, QUICK_SLOT_COUNT};
use spellcast_core::{Result, SpellError};

/// Slot table as id references.
pub type SlotIds = [Option<String>; QUICK_SLOT_COUNT];

/// What a spell book contained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedBook {
    /// Custom spells only; built-in ids are dropped on load
    pub spells: Vec<Spell>,
    pub slots: SlotIds,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BookOut<'a> {
    spells: Vec<&'a Spell>,
    quick_slots: Vec<Option<&'a Spell>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookIn {
    #[serde(default)]
    spells: Vec<serde_json::Value>,
    #[serde(default)]
    quick_slots: Vec<Option<SlotEntry>>,
}

/// A slot entry is a spell record; a bare id string is accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum SlotEntry {
    Id(String),
    Record { id: String },
}

impl SlotEntry {
    fn into_id(self) -> String {
        match self {
            Self::Id(id) | Self::Record { id } => id,
        }
    }
}

/// The spell-book file.
#[derive(Debug, Clone)]
pub struct SpellBookStore {
    path: PathBuf,
}

impl SpellBookStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the spell book. `None` when no file exists yet.
    ///
    /// A malformed document is an error; a single malformed spell inside a
    /// valid document is skipped with a warning.
    pub fn load(&self) -> Result<Option<LoadedBook>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SpellError::Persistence {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let raw: BookIn = serde_json::from_str(&content)?;

        let mut spells = Vec::with_capacity(raw.spells.len());
        for value in raw.spells {
            match serde_json::from_value::<Spell>(value) {
                Ok(spell) if is_builtin(&spell.id) => {
                    tracing::debug!(id = %spell.id, "ignoring persisted copy of built-in spell");
                }
                Ok(spell) => spells.push(spell),
                Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "skipping invalid spell in spell book"),
            }
        }

        let mut slots = SlotIds::default();
        for (slot, entry) in slots.iter_mut().zip(raw.quick_slots) {
            *slot = entry.map(SlotEntry::into_id).filter(|id| !id.is_empty());
        }

        tracing::debug!(path = %self.path.display(), spells = spells.len(), "spell book loaded");
        Ok(Some(LoadedBook { spells, slots }))
    }

    /// Write the full snapshot. Atomic: written to `.tmp` then renamed.
    pub fn save<'a>(
        &self,
        spells: impl IntoIterator<Item = &'a Spell>,
        slots: &[Option<&'a Spell>; QUICK_SLOT_COUNT],
    ) -> Result<()> {
        let doc = BookOut {
            spells: spells.into_iter().filter(|s| !is_builtin(&s.id)).collect(),
            quick_slots: slots.to_vec(),
        };
        let content = serde_json::to_string_pretty(&doc)?;

        let persist_err = |source| SpellError::Persistence {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(persist_err)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, content).map_err(persist_err)?;
        std::fs::rename(&tmp, &self.path).map_err(persist_err)?;
        tracing::debug!(path = %self.path.display(), custom = doc.spells.len(), "spell book saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spellcast_core::spell::{OutputFormat, ScriptSource};

    fn spell(id: &str) -> Spell {
        Spell {
            id: id.into(),
            name: format!("Spell {id}"),
            description: String::new(),
            category: "custom".into(),
            icon: None,
            source: ScriptSource::Inline("print(1)".into()),
            args: Vec::new(),
            timeout: None,
            requires_input: true,
            output_format: OutputFormat::Text,
            estimated_time: None,
        }
    }

    fn no_slots<'a>() -> [Option<&'a Spell>; QUICK_SLOT_COUNT] {
        [None; QUICK_SLOT_COUNT]
    }

    #[test]
    fn test_missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SpellBookStore::new(dir.path().join("spell_book.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_writes_slots_by_value_and_skips_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let store = SpellBookStore::new(dir.path().join("nested").join("spell_book.json"));
        let custom = spell("custom-1");
        let builtin = spell("word-counter");
        let mut slots = no_slots();
        slots[0] = Some(&builtin);
        slots[3] = Some(&custom);
        store.save([&custom, &builtin], &slots).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["spells"].as_array().unwrap().len(), 1);
        assert_eq!(raw["spells"][0]["id"], "custom-1");
        assert_eq!(raw["quickSlots"].as_array().unwrap().len(), 9);
        assert_eq!(raw["quickSlots"][0]["id"], "word-counter");
        assert_eq!(raw["quickSlots"][0]["name"], "Spell word-counter");
        assert!(raw["quickSlots"][1].is_null());
        assert!(!store.path().with_extension("tmp").exists());

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.spells, vec![custom]);
        assert_eq!(loaded.slots[0].as_deref(), Some("word-counter"));
        assert_eq!(loaded.slots[3].as_deref(), Some("custom-1"));
        assert!(loaded.slots[8].is_none());
    }

    #[test]
    fn test_load_tolerates_bad_entries_and_short_slot_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spell_book.json");
        std::fs::write(
            &path,
            r#"{
                "spells": [
                    {"id": "custom-ok", "name": "Ok", "script": "print(1)"},
                    {"id": "custom-bad", "name": "Both", "script": "x", "scriptFile": "/x.py"},
                    {"id": "text-cleaner", "name": "Stale", "script": "x"}
                ],
                "quickSlots": [null, "custom-ok", {"id": "text-cleaner", "name": "Stale"}]
            }"#,
        )
        .unwrap();

        let loaded = SpellBookStore::new(&path).load().unwrap().unwrap();
        let ids: Vec<&str> = loaded.spells.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["custom-ok"]);
        assert_eq!(loaded.slots[1].as_deref(), Some("custom-ok"));
        assert_eq!(loaded.slots[2].as_deref(), Some("text-cleaner"));
        assert!(loaded.slots[3..].iter().all(Option::is_none));
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spell_book.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(SpellBookStore::new(&path).load(), Err(SpellError::Json(_))));
    }
}
