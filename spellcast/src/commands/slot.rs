//! Quick slot management: list, assign, clear.

use anyhow::{bail, Result};

use super::AppContext;

/// `spellcast slot list`
pub fn cmd_list(ctx: &AppContext) -> Result<()> {
    let registry = ctx.catalog_registry()?;
    for (i, slot) in registry.get_quick_slots().iter().enumerate() {
        match slot {
            Some(spell) => println!(
                "{}: {} {} ({})",
                i + 1,
                spell.icon.as_deref().unwrap_or(" "),
                spell.name,
                spell.id
            ),
            None => println!("{}: (empty)", i + 1),
        }
    }
    Ok(())
}

/// `spellcast slot assign <id> <n>`
pub fn cmd_assign(ctx: &AppContext, id: &str, slot: u8) -> Result<()> {
    let registry = ctx.catalog_registry()?;
    if !registry.assign_quick_slot(id, slot)? {
        bail!("Spell '{}' not found", id);
    }
    eprintln!("✓ Slot {} → {}", slot, id);
    Ok(())
}

/// `spellcast slot clear <n>`
pub fn cmd_clear(ctx: &AppContext, slot: u8) -> Result<()> {
    let registry = ctx.catalog_registry()?;
    if registry.clear_quick_slot(slot)? {
        eprintln!("✓ Slot {} cleared", slot);
    } else {
        eprintln!("Slot {} was already empty", slot);
    }
    Ok(())
}
