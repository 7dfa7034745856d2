//! Handler table behind `spellcast`'s subcommands.
//!
//! Each family (`env`, `spell`, `cast`, `slot`) registers one handler from
//! `dispatch`. A handler claims the `Commands` variants it owns and answers
//! `None` for the rest, so a new family never touches `lib.rs`.

use anyhow::Result;

use crate::cli::Commands;
use crate::commands::AppContext;

type Handler = Box<dyn Fn(&Commands, &AppContext) -> Option<Result<()>> + Send + Sync>;

struct Family {
    name: &'static str,
    handler: Handler,
}

/// Tried in registration order; the first family that claims the command runs it.
#[derive(Default)]
pub struct CommandRegistry {
    families: Vec<Family>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &'static str, handler: F)
    where
        F: Fn(&Commands, &AppContext) -> Option<Result<()>> + Send + Sync + 'static,
    {
        self.families.push(Family {
            name,
            handler: Box::new(handler),
        });
    }

    pub fn dispatch(&self, cmd: &Commands, ctx: &AppContext) -> Result<()> {
        for family in &self.families {
            if let Some(outcome) = (family.handler)(cmd, ctx) {
                tracing::debug!(family = family.name, ok = outcome.is_ok(), "command finished");
                return outcome;
            }
        }
        anyhow::bail!("no command family handles {:?}", cmd)
    }
}
