//! Spell book management: list, show, add, update, remove.

use anyhow::{bail, Result};
use spellcast_core::spell::{is_builtin, ScriptSource, Spell, SpellDraft, SpellPatch};

use super::AppContext;

/// `spellcast spell list`
pub fn cmd_list(ctx: &AppContext, category: Option<&str>, json: bool) -> Result<()> {
    let registry = ctx.catalog_registry()?;
    let spells = match category {
        Some(c) => registry.spells_in_category(c),
        None => registry.get_spell_book(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&spells)?);
        return Ok(());
    }
    if spells.is_empty() {
        eprintln!("No spells found.");
        return Ok(());
    }
    for spell in &spells {
        println!("{}", summary_line(spell));
    }
    Ok(())
}

fn summary_line(spell: &Spell) -> String {
    let origin = if is_builtin(&spell.id) { "built-in" } else { "custom" };
    let source = match spell.source {
        ScriptSource::Inline(_) => "inline".to_string(),
        ScriptSource::File(ref p) => p.display().to_string(),
    };
    format!(
        "{} {:<20} {:<22} [{}] {} ({}, {})",
        spell.icon.as_deref().unwrap_or(" "),
        spell.id,
        spell.name,
        spell.category,
        origin,
        source,
        spell.estimated_time.as_deref().unwrap_or("?")
    )
}

/// `spellcast spell show <id>`
pub fn cmd_show(ctx: &AppContext, id: &str) -> Result<()> {
    let registry = ctx.catalog_registry()?;
    let Some(spell) = registry.get_spell(id) else {
        bail!("Spell '{}' not found", id);
    };
    println!("{}", serde_json::to_string_pretty(&spell)?);
    Ok(())
}

/// `spellcast spell add`
pub fn cmd_add(ctx: &AppContext, draft: SpellDraft) -> Result<()> {
    let registry = ctx.catalog_registry()?;
    let id = registry.add_custom_spell(draft)?;
    println!("{}", id);
    eprintln!("✓ Added spell {}", id);
    Ok(())
}

/// `spellcast spell update <id>`
pub fn cmd_update(ctx: &AppContext, id: &str, patch: SpellPatch) -> Result<()> {
    let registry = ctx.catalog_registry()?;
    if !registry.update_spell(id, patch)? {
        bail!("Spell '{}' not found", id);
    }
    if is_builtin(id) {
        eprintln!("⚠ {} is built-in; the change lasts only for this run", id);
    } else {
        eprintln!("✓ Updated spell {}", id);
    }
    Ok(())
}

/// `spellcast spell remove <id>`
pub fn cmd_remove(ctx: &AppContext, id: &str) -> Result<()> {
    let registry = ctx.catalog_registry()?;
    if !registry.delete_spell(id)? {
        bail!("Spell '{}' not found", id);
    }
    eprintln!("✓ Removed spell {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spellcast_core::spell::builtin_spells;
    use std::path::Path;

    #[test]
    fn test_summary_line_marks_origin_and_source() {
        let spells = builtin_spells(Path::new("/scripts"));
        let analyzer = spells.iter().find(|s| s.id == "text-analyzer").unwrap();
        let line = summary_line(analyzer);
        assert!(line.contains("built-in"));
        assert!(line.contains("text_analyzer.py"));

        let counter = spells.iter().find(|s| s.id == "word-counter").unwrap();
        assert!(summary_line(counter).contains("inline"));
    }
}
