//! Command dispatch: each command family registers its handlers here.

use crate::cli::{Commands, EnvAction, SlotAction, SpellAction};
use crate::command_registry::CommandRegistry;
use crate::commands;

pub fn register_all(reg: &mut CommandRegistry) {
    register_env(reg);
    register_spell(reg);
    register_cast(reg);
    register_slot(reg);
}

fn register_env(reg: &mut CommandRegistry) {
    reg.register("env", |cmd, ctx| {
        let Commands::Env { action } = cmd else {
            return None;
        };
        Some(match action {
            EnvAction::Info => commands::env::cmd_info(ctx),
            EnvAction::Install { package } => commands::env::cmd_install(ctx, package),
            EnvAction::Clean { dry_run, force } => commands::env::cmd_clean(ctx, *dry_run, *force),
        })
    });
}

fn register_spell(reg: &mut CommandRegistry) {
    reg.register("spell", |cmd, ctx| {
        let Commands::Spell { action } = cmd else {
            return None;
        };
        Some(match action {
            SpellAction::List { category, json } => {
                commands::spell::cmd_list(ctx, category.as_deref(), *json)
            }
            SpellAction::Show { id } => commands::spell::cmd_show(ctx, id),
            SpellAction::Add { id, def } => commands::spell::cmd_add(ctx, def.to_draft(id.clone())),
            SpellAction::Update { id, def } => commands::spell::cmd_update(ctx, id, def.to_patch()),
            SpellAction::Remove { id } => commands::spell::cmd_remove(ctx, id),
            SpellAction::Test { def, input } => {
                commands::cast::cmd_test(ctx, def.to_draft(None), input.clone())
            }
        })
    });
}

fn register_cast(reg: &mut CommandRegistry) {
    reg.register("cast", |cmd, ctx| {
        if let Commands::Cast { id, input } = cmd {
            Some(commands::cast::cmd_cast(ctx, id, input.clone()))
        } else {
            None
        }
    });
}

fn register_slot(reg: &mut CommandRegistry) {
    reg.register("slot", |cmd, ctx| {
        let Commands::Slot { action } = cmd else {
            return None;
        };
        Some(match action {
            SlotAction::List => commands::slot::cmd_list(ctx),
            SlotAction::Assign { id, slot } => commands::slot::cmd_assign(ctx, id, *slot),
            SlotAction::Clear { slot } => commands::slot::cmd_clear(ctx, *slot),
            SlotAction::Cast { slot, input } => commands::cast::cmd_cast_slot(ctx, *slot, input.clone()),
        })
    });
}
