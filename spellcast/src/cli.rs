use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use spellcast_core::spell::{OutputFormat, SpellDraft, SpellPatch};

/// Spellcast - short script spells bound to quick slots, cast against text
#[derive(Parser, Debug)]
#[command(name = "spellcast")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Spell book file (default: from env or ~/.spellcast/spell_book.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub spell_book: Option<PathBuf>,

    /// Default spell timeout in milliseconds (default: from env or 30000)
    #[arg(long, global = true, value_name = "MS")]
    pub timeout: Option<u64>,

    /// File standing in for the shared clipboard; routed output is written here
    #[arg(long, global = true, value_name = "FILE")]
    pub clipboard: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the embedded interpreter environment
    Env {
        #[command(subcommand)]
        action: EnvAction,
    },

    /// Manage the spell book
    Spell {
        #[command(subcommand)]
        action: SpellAction,
    },

    /// Cast a spell by id
    Cast {
        #[arg(value_name = "SPELL_ID")]
        id: String,

        /// Input text (read from stdin when omitted)
        #[arg(long)]
        input: Option<String>,
    },

    /// Manage and cast quick slots (1-9)
    Slot {
        #[command(subcommand)]
        action: SlotAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum EnvAction {
    /// Resolve the interpreter (provisioning it if needed) and print it as JSON
    Info,

    /// Install a package into the resolved environment
    Install {
        #[arg(value_name = "PACKAGE")]
        package: String,
    },

    /// Remove the embedded environment
    Clean {
        /// Show what would be removed without deleting
        #[arg(long, default_value = "false")]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(long, short = 'f', default_value = "false")]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum SpellAction {
    /// List spells
    List {
        /// Only spells in this category
        #[arg(long)]
        category: Option<String>,

        /// Output as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Show one spell as JSON
    Show {
        #[arg(value_name = "SPELL_ID")]
        id: String,
    },

    /// Add a custom spell
    Add {
        /// Spell id (default: custom-<uuid>)
        #[arg(long)]
        id: Option<String>,

        #[command(flatten)]
        def: SpellArgs,
    },

    /// Update fields of an existing spell
    Update {
        #[arg(value_name = "SPELL_ID")]
        id: String,

        #[command(flatten)]
        def: SpellArgs,
    },

    /// Delete a spell and clear its quick slots
    Remove {
        #[arg(value_name = "SPELL_ID")]
        id: String,
    },

    /// Run a definition once without registering it
    Test {
        #[command(flatten)]
        def: SpellArgs,

        /// Input text (read from stdin when omitted)
        #[arg(long)]
        input: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SlotAction {
    /// Show all nine slots
    List,

    /// Bind a spell to a slot
    Assign {
        #[arg(value_name = "SPELL_ID")]
        id: String,

        #[arg(value_name = "SLOT")]
        slot: u8,
    },

    /// Empty a slot
    Clear {
        #[arg(value_name = "SLOT")]
        slot: u8,
    },

    /// Cast the spell bound to a slot
    Cast {
        #[arg(value_name = "SLOT")]
        slot: u8,

        /// Input text (read from stdin when omitted)
        #[arg(long)]
        input: Option<String>,
    },
}

/// Spell fields shared by `add`, `update` and `test`.
#[derive(Args, Debug, Default, Clone)]
pub struct SpellArgs {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub icon: Option<String>,

    /// Inline script source
    #[arg(long, conflicts_with = "script_file")]
    pub script: Option<String>,

    /// Script file path
    #[arg(long = "file", value_name = "PATH")]
    pub script_file: Option<PathBuf>,

    /// Script argument (repeatable)
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Spell timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Do not pass input text on stdin
    #[arg(long, default_value = "false", conflicts_with = "input_required")]
    pub no_input: bool,

    /// Pass input text on stdin (the default; undoes an earlier --no-input)
    #[arg(long, default_value = "false")]
    pub input_required: bool,

    /// Output routing: text, json, replace or append
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Human-readable duration estimate, e.g. "< 1 second"
    #[arg(long)]
    pub estimated_time: Option<String>,
}

impl SpellArgs {
    fn args(&self) -> Option<Vec<String>> {
        (!self.args.is_empty()).then(|| self.args.clone())
    }

    fn requires_input(&self) -> Option<bool> {
        match (self.no_input, self.input_required) {
            (true, _) => Some(false),
            (false, true) => Some(true),
            (false, false) => None,
        }
    }

    pub fn to_draft(&self, id: Option<String>) -> SpellDraft {
        SpellDraft {
            id,
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            icon: self.icon.clone(),
            script: self.script.clone(),
            script_file: self.script_file.clone(),
            args: self.args(),
            timeout_ms: self.timeout_ms,
            requires_input: self.requires_input(),
            output_format: self.format,
            estimated_time: self.estimated_time.clone(),
        }
    }

    pub fn to_patch(&self) -> SpellPatch {
        SpellPatch {
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            icon: self.icon.clone(),
            script: self.script.clone(),
            script_file: self.script_file.clone(),
            args: self.args(),
            timeout_ms: self.timeout_ms,
            requires_input: self.requires_input(),
            output_format: self.format,
            estimated_time: self.estimated_time.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cast_with_globals() {
        let cli = Cli::parse_from([
            "spellcast",
            "cast",
            "word-counter",
            "--input",
            "hello world",
            "--timeout",
            "500",
        ]);
        assert_eq!(cli.timeout, Some(500));
        match cli.command {
            Commands::Cast { id, input } => {
                assert_eq!(id, "word-counter");
                assert_eq!(input.as_deref(), Some("hello world"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_spell_add_builds_draft() {
        let cli = Cli::parse_from([
            "spellcast", "spell", "add", "--id", "shout", "--script", "print(input().upper())",
            "--format", "replace", "--arg", "-v", "--no-input",
        ]);
        let Commands::Spell {
            action: SpellAction::Add { id, def },
        } = cli.command
        else {
            panic!("expected spell add");
        };
        let draft = def.to_draft(id);
        assert_eq!(draft.id.as_deref(), Some("shout"));
        assert_eq!(draft.output_format, Some(OutputFormat::Replace));
        assert_eq!(draft.args, Some(vec!["-v".to_string()]));
        assert_eq!(draft.requires_input, Some(false));
    }

    #[test]
    fn test_update_can_turn_input_back_on() {
        let cli = Cli::parse_from(["spellcast", "spell", "update", "s1", "--input-required"]);
        let Commands::Spell {
            action: SpellAction::Update { def, .. },
        } = cli.command
        else {
            panic!("expected spell update");
        };
        assert_eq!(def.to_patch().requires_input, Some(true));

        let res = Cli::try_parse_from([
            "spellcast", "spell", "update", "s1", "--input-required", "--no-input",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_script_and_file_conflict() {
        let res = Cli::try_parse_from([
            "spellcast", "spell", "test", "--script", "x", "--file", "a.py",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_update_patch_leaves_unset_fields() {
        let cli = Cli::parse_from(["spellcast", "spell", "update", "s1", "--name", "New"]);
        let Commands::Spell {
            action: SpellAction::Update { id, def },
        } = cli.command
        else {
            panic!("expected spell update");
        };
        assert_eq!(id, "s1");
        let patch = def.to_patch();
        assert_eq!(patch.name.as_deref(), Some("New"));
        assert!(patch.script.is_none() && patch.args.is_none() && patch.requires_input.is_none());
    }
}
