//! Casting: by id, by quick slot, and ad hoc test runs.

use anyhow::Result;
use spellcast_core::spell::SpellDraft;
use spellcast_core::ExecutionResult;

use super::{read_input, runtime, AppContext};

/// `spellcast cast <id>`
pub fn cmd_cast(ctx: &AppContext, id: &str, input: Option<String>) -> Result<()> {
    let input = read_input(input)?;
    let registry = ctx.casting_registry()?;
    let result = runtime()?.block_on(registry.cast_spell(id, &input))?;
    print_result(&result);
    Ok(())
}

/// `spellcast slot cast <n>`
pub fn cmd_cast_slot(ctx: &AppContext, slot: u8, input: Option<String>) -> Result<()> {
    let input = read_input(input)?;
    let registry = ctx.casting_registry()?;
    let result = runtime()?.block_on(registry.cast_quick_slot(slot, &input))?;
    print_result(&result);
    Ok(())
}

/// `spellcast spell test`
pub fn cmd_test(ctx: &AppContext, draft: SpellDraft, input: Option<String>) -> Result<()> {
    let input = read_input(input)?;
    let registry = ctx.casting_registry()?;
    let result = runtime()?.block_on(registry.test_spell(draft, &input))?;
    print_result(&result);
    if !result.stderr.is_empty() {
        eprintln!("--- stderr ---\n{}", result.stderr);
    }
    eprintln!("({}ms)", result.execution_time.as_millis());
    Ok(())
}

fn print_result(result: &ExecutionResult) {
    if !result.stdout.is_empty() {
        println!("{}", result.stdout);
    }
}
