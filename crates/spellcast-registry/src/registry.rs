//! SpellRegistry: catalog, quick slots, persistence and cast dispatch.
//!
//! One mutex guards the catalog. Mutations are applied to a copy, written to
//! the spell book while the lock is held, and committed only once the write
//! succeeded, so memory and disk never disagree. Casts take the lock just long
//! enough to clone the spell; execution itself is unserialized.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use spellcast_core::config::{ExecutionConfig, PathsConfig};
use spellcast_core::spell::{
    builtin_spells, is_builtin, materialize_scripts, slot_index, timeout_from_ms, OutputFormat, ScriptSource,
    Spell, SpellDraft, SpellPatch, DEFAULT_QUICK_SLOTS, QUICK_SLOT_COUNT,
};
use spellcast_core::{ExecutionResult, Result, SpellError};
use spellcast_sandbox::{RunOptions, ScriptExecutor};

use crate::notify::{CastNotification, NotificationSink, NullSink};
use crate::routing::{pretty_json, route_output, SharedText};
use crate::store::{SlotIds, SpellBookStore};

const CUSTOM_ID_PREFIX: &str = "custom-";
const DEFAULT_CUSTOM_NAME: &str = "Custom Spell";
const DEFAULT_CUSTOM_DESCRIPTION: &str = "A custom Python spell";
const DEFAULT_CUSTOM_CATEGORY: &str = "custom";
const DEFAULT_CUSTOM_ICON: &str = "🪄";
const DEFAULT_ESTIMATE: &str = "Unknown";
const TEST_SPELL_ID: &str = "test-spell";

#[derive(Debug, Clone, Default)]
struct Catalog {
    /// Built-ins first, then custom spells in insertion order
    spells: Vec<Spell>,
    slots: SlotIds,
}

impl Catalog {
    fn get(&self, id: &str) -> Option<&Spell> {
        self.spells.iter().find(|s| s.id == id)
    }

    fn resolved_slots(&self) -> [Option<&Spell>; QUICK_SLOT_COUNT] {
        std::array::from_fn(|i| self.slots[i].as_deref().and_then(|id| self.get(id)))
    }
}

pub struct SpellRegistryBuilder {
    executor: ScriptExecutor,
    spell_book: PathBuf,
    scripts_dir: PathBuf,
    config: ExecutionConfig,
    shared_text: Option<Arc<dyn SharedText>>,
    sink: Arc<dyn NotificationSink>,
}

impl SpellRegistryBuilder {
    #[must_use]
    pub fn execution_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn spell_book(mut self, path: impl Into<PathBuf>) -> Self {
        self.spell_book = path.into();
        self
    }

    #[must_use]
    pub fn shared_text(mut self, target: Arc<dyn SharedText>) -> Self {
        self.shared_text = Some(target);
        self
    }

    #[must_use]
    pub fn notifications(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Register built-ins, then load the spell book. Default quick slots are
    /// applied only when no spell book exists yet.
    pub fn build(self) -> Result<SpellRegistry> {
        if let Err(e) = materialize_scripts(&self.scripts_dir) {
            tracing::warn!(dir = %self.scripts_dir.display(), error = %e, "could not write built-in scripts");
        }

        let store = SpellBookStore::new(self.spell_book);
        let mut catalog = Catalog {
            spells: builtin_spells(&self.scripts_dir),
            slots: SlotIds::default(),
        };

        match store.load()? {
            Some(book) => {
                catalog.spells.extend(book.spells);
                for (i, id) in book.slots.into_iter().enumerate() {
                    let Some(id) = id else { continue };
                    if catalog.get(&id).is_some() {
                        catalog.slots[i] = Some(id);
                    } else {
                        tracing::warn!(slot = i + 1, id = %id, "quick slot refers to unknown spell, clearing");
                    }
                }
            }
            None => {
                for (slot, id) in catalog.slots.iter_mut().zip(DEFAULT_QUICK_SLOTS) {
                    *slot = Some(id.to_string());
                }
            }
        }

        tracing::info!(
            spells = catalog.spells.len(),
            assigned = catalog.slots.iter().filter(|s| s.is_some()).count(),
            spell_book = %store.path().display(),
            "spell registry ready"
        );

        Ok(SpellRegistry {
            state: Mutex::new(catalog),
            store,
            executor: self.executor,
            config: self.config,
            shared_text: self.shared_text,
            sink: self.sink,
        })
    }
}

/// The spell catalog and quick-slot table for one application.
pub struct SpellRegistry {
    state: Mutex<Catalog>,
    store: SpellBookStore,
    executor: ScriptExecutor,
    config: ExecutionConfig,
    shared_text: Option<Arc<dyn SharedText>>,
    sink: Arc<dyn NotificationSink>,
}

impl SpellRegistry {
    pub fn builder(executor: ScriptExecutor, paths: &PathsConfig) -> SpellRegistryBuilder {
        SpellRegistryBuilder {
            executor,
            spell_book: paths.spell_book.clone(),
            scripts_dir: paths.scripts_dir.clone(),
            config: ExecutionConfig::default(),
            shared_text: None,
            sink: Arc::new(NullSink),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Catalog> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to a copy of the catalog, persist the copy, then commit it.
    fn mutate<T>(&self, f: impl FnOnce(&mut Catalog) -> Result<Option<T>>) -> Result<Option<T>> {
        let mut guard = self.lock();
        let mut next = guard.clone();
        let Some(out) = f(&mut next)? else {
            return Ok(None);
        };
        self.store.save(&next.spells, &next.resolved_slots())?;
        *guard = next;
        Ok(Some(out))
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    pub fn get_spell_book(&self) -> Vec<Spell> {
        self.lock().spells.clone()
    }

    /// Slots resolved against the live catalog.
    pub fn get_quick_slots(&self) -> [Option<Spell>; QUICK_SLOT_COUNT] {
        let guard = self.lock();
        let resolved = guard.resolved_slots();
        std::array::from_fn(|i| resolved[i].cloned())
    }

    pub fn get_spell(&self, id: &str) -> Option<Spell> {
        self.lock().get(id).cloned()
    }

    pub fn spells_in_category(&self, category: &str) -> Vec<Spell> {
        self.lock()
            .spells
            .iter()
            .filter(|s| s.category.eq_ignore_ascii_case(category))
            .cloned()
            .collect()
    }

    // ─── Mutations ──────────────────────────────────────────────────────────

    /// Register a custom spell and return its id. Unset fields take the
    /// custom-spell defaults; the id defaults to `custom-<uuid>`.
    pub fn add_custom_spell(&self, draft: SpellDraft) -> Result<String> {
        let id = match draft.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("{}{}", CUSTOM_ID_PREFIX, uuid::Uuid::new_v4().simple()),
        };
        if is_builtin(&id) {
            return Err(SpellError::Configuration(format!(
                "spell id '{}' collides with a built-in spell",
                id
            )));
        }
        let spell = spell_from_draft(id, draft, self.config.default_timeout)?;

        let id = self
            .mutate(|catalog| {
                if catalog.get(&spell.id).is_some() {
                    return Err(SpellError::Configuration(format!(
                        "spell '{}' already exists",
                        spell.id
                    )));
                }
                let id = spell.id.clone();
                catalog.spells.push(spell);
                Ok(Some(id))
            })?
            .unwrap_or_default();
        tracing::info!(id = %id, "custom spell added");
        Ok(id)
    }

    /// Shallow-merge `patch` into the spell. `Ok(false)` when the id is unknown.
    ///
    /// Built-ins can be patched, but only for the lifetime of this registry:
    /// they are never persisted.
    pub fn update_spell(&self, id: &str, patch: SpellPatch) -> Result<bool> {
        let updated = self.mutate(|catalog| {
            let Some(spell) = catalog.spells.iter_mut().find(|s| s.id == id) else {
                return Ok(None);
            };
            spell.apply(patch)?;
            Ok(Some(()))
        })?;
        if updated.is_some() {
            tracing::info!(id, "spell updated");
        }
        Ok(updated.is_some())
    }

    /// Remove a spell and clear every quick slot that referenced it.
    pub fn delete_spell(&self, id: &str) -> Result<bool> {
        let cleared = self.mutate(|catalog| {
            let before = catalog.spells.len();
            catalog.spells.retain(|s| s.id != id);
            if catalog.spells.len() == before {
                return Ok(None);
            }
            let mut cleared = 0usize;
            for slot in catalog.slots.iter_mut() {
                if slot.as_deref() == Some(id) {
                    *slot = None;
                    cleared += 1;
                }
            }
            Ok(Some(cleared))
        })?;
        match cleared {
            Some(cleared) => {
                tracing::info!(id, cleared_slots = cleared, "spell deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Bind spell `id` to slot `n` (1..=9). `Ok(false)` when the id is unknown.
    pub fn assign_quick_slot(&self, id: &str, n: u8) -> Result<bool> {
        let index = slot_index(n)?;
        let assigned = self.mutate(|catalog| {
            if catalog.get(id).is_none() {
                return Ok(None);
            }
            catalog.slots[index] = Some(id.to_string());
            Ok(Some(()))
        })?;
        if assigned.is_some() {
            tracing::info!(id, slot = n, "quick slot assigned");
        }
        Ok(assigned.is_some())
    }

    /// Empty slot `n`. `Ok(false)` when it was already empty.
    pub fn clear_quick_slot(&self, n: u8) -> Result<bool> {
        let index = slot_index(n)?;
        let cleared = self.mutate(|catalog| Ok(catalog.slots[index].take().map(|_| ())))?;
        Ok(cleared.is_some())
    }

    // ─── Casting ────────────────────────────────────────────────────────────

    /// Run spell `id` against `input`, route its output and notify the sink.
    pub async fn cast_spell(&self, id: &str, input: &str) -> Result<ExecutionResult> {
        let started = Instant::now();
        let Some(spell) = self.get_spell(id) else {
            let err = SpellError::NotFound(id.to_string());
            self.report(id, id, started.elapsed(), Err(&err));
            return Err(err);
        };

        tracing::info!(id = %spell.id, format = ?spell.output_format, "casting spell");
        let outcome = self.execute(&spell, input, true).await;

        if let Ok(ref result) = outcome {
            if !result.stdout.is_empty() {
                self.route(spell.output_format, &result.stdout).await;
            }
        }
        self.report(&spell.id, &spell.name, started.elapsed(), outcome.as_ref().map(|_| ()));
        outcome
    }

    /// Cast whatever sits in slot `n` (1..=9).
    pub async fn cast_quick_slot(&self, n: u8, input: &str) -> Result<ExecutionResult> {
        let index = slot_index(n)?;
        let bound = {
            let guard = self.lock();
            guard.slots[index].clone()
        };
        match bound {
            Some(id) => self.cast_spell(&id, input).await,
            None => {
                let err = SpellError::NotAssigned(n);
                self.report("", &format!("Quick slot {n}"), Duration::ZERO, Err(&err));
                Err(err)
            }
        }
    }

    /// Run an unregistered definition once. Input is always passed, the test
    /// timeout applies unless the draft sets one, and nothing is routed,
    /// persisted or notified.
    pub async fn test_spell(&self, draft: SpellDraft, input: &str) -> Result<ExecutionResult> {
        let timeout = timeout_from_ms(draft.timeout_ms).unwrap_or(self.config.test_timeout);
        let mut spell = spell_from_draft(TEST_SPELL_ID.to_string(), draft, timeout)?;
        spell.requires_input = true;
        spell.timeout = Some(timeout);
        tracing::debug!(format = ?spell.output_format, "testing unregistered spell");
        self.execute(&spell, input, false).await
    }

    async fn execute(&self, spell: &Spell, input: &str, registered: bool) -> Result<ExecutionResult> {
        let mut options = RunOptions::from_source(&spell.source)
            .with_args(spell.args.clone())
            .with_timeout(spell.effective_timeout(self.config.default_timeout));
        if spell.requires_input {
            options = options.with_stdin(input);
        }

        let mut result = self.executor.run(options).await.inspect_err(|e| {
            if registered {
                tracing::warn!(id = %spell.id, kind = e.kind(), error = %e, "spell failed");
            }
        })?;

        if spell.output_format == OutputFormat::Json {
            result.stdout = pretty_json(&result.stdout);
        }
        Ok(result)
    }

    async fn route(&self, format: OutputFormat, output: &str) {
        let Some(target) = self.shared_text.clone() else {
            return;
        };
        let output = output.to_string();
        // SharedText implementations may block (clipboard, files).
        let routed = tokio::task::spawn_blocking(move || route_output(target.as_ref(), format, &output)).await;
        match routed {
            Ok(Ok(())) => tracing::debug!(?format, "output routed"),
            Ok(Err(e)) => tracing::warn!(?format, error = %e, "output routing failed"),
            Err(e) => tracing::warn!(error = %e, "output routing task failed"),
        }
    }

    fn report(&self, id: &str, name: &str, elapsed: Duration, outcome: std::result::Result<(), &SpellError>) {
        let notification = match outcome {
            Ok(()) => {
                tracing::info!(id, elapsed_ms = elapsed.as_millis() as u64, "spell cast");
                CastNotification::succeeded(id, name, elapsed)
            }
            Err(e) => CastNotification::failed(id, name, elapsed, e),
        };
        self.sink.notify(&notification);
    }
}

/// Fill unset draft fields with the custom-spell defaults.
fn spell_from_draft(id: String, draft: SpellDraft, default_timeout: Duration) -> Result<Spell> {
    let source = ScriptSource::from_parts(draft.script, draft.script_file)?;
    Ok(Spell {
        id,
        name: draft
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CUSTOM_NAME.to_string()),
        description: draft
            .description
            .unwrap_or_else(|| DEFAULT_CUSTOM_DESCRIPTION.to_string()),
        category: draft
            .category
            .unwrap_or_else(|| DEFAULT_CUSTOM_CATEGORY.to_string()),
        icon: Some(draft.icon.unwrap_or_else(|| DEFAULT_CUSTOM_ICON.to_string())),
        source,
        args: draft.args.unwrap_or_default(),
        timeout: Some(timeout_from_ms(draft.timeout_ms).unwrap_or(default_timeout)),
        requires_input: draft.requires_input.unwrap_or(true),
        output_format: draft.output_format.unwrap_or_default(),
        estimated_time: Some(
            draft
                .estimated_time
                .unwrap_or_else(|| DEFAULT_ESTIMATE.to_string()),
        ),
    })
}
