use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, SpellError};

/// Number of quick-access slots. Slots are addressed 1-based.
pub const QUICK_SLOT_COUNT: usize = 9;

/// Validate a 1-based slot number and return its 0-based index.
pub fn slot_index(slot: u8) -> Result<usize> {
    if slot == 0 || slot as usize > QUICK_SLOT_COUNT {
        return Err(SpellError::Configuration(format!(
            "quick slot must be between 1 and {}, got {}",
            QUICK_SLOT_COUNT, slot
        )));
    }
    Ok(slot as usize - 1)
}

/// Where a spell's output is routed after a successful cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    /// Pretty-print stdout when it parses as JSON
    Json,
    Replace,
    /// Concatenate onto the shared text instead of overwriting it
    Append,
}

impl std::str::FromStr for OutputFormat {
    type Err = SpellError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "replace" => Ok(Self::Replace),
            "append" => Ok(Self::Append),
            other => Err(SpellError::Configuration(format!(
                "unknown output format '{}' (expected text, json, replace or append)",
                other
            ))),
        }
    }
}

/// The script a spell runs: inline source text or a file on disk. Never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    Inline(String),
    File(PathBuf),
}

impl ScriptSource {
    /// Build from the two optional wire fields. Blank inline text counts as absent.
    pub fn from_parts(script: Option<String>, script_file: Option<PathBuf>) -> Result<Self> {
        let script = script.filter(|s| !s.trim().is_empty());
        let script_file = script_file.filter(|p| !p.as_os_str().is_empty());
        match (script, script_file) {
            (Some(_), Some(_)) => Err(SpellError::Configuration(
                "spell defines both script and scriptFile".to_string(),
            )),
            (Some(s), None) => Ok(Self::Inline(s)),
            (None, Some(p)) => Ok(Self::File(p)),
            (None, None) => Err(SpellError::Configuration(
                "spell defines neither script nor scriptFile".to_string(),
            )),
        }
    }

    fn into_parts(self) -> (Option<String>, Option<PathBuf>) {
        match self {
            Self::Inline(s) => (Some(s), None),
            Self::File(p) => (None, Some(p)),
        }
    }
}

/// A registered spell.
///
/// Serialized in the spell-book wire shape (`script` / `scriptFile` as two
/// optional fields); deserialization rejects records that break the
/// one-source invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SpellRecord", into = "SpellRecord")]
pub struct Spell {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub icon: Option<String>,
    pub source: ScriptSource,
    pub args: Vec<String>,
    /// `None` means "use the configured default timeout"
    pub timeout: Option<Duration>,
    pub requires_input: bool,
    pub output_format: OutputFormat,
    pub estimated_time: Option<String>,
}

/// A timeout given in milliseconds. Zero counts as unset.
pub fn timeout_from_ms(ms: Option<u64>) -> Option<Duration> {
    ms.filter(|&ms| ms > 0).map(Duration::from_millis)
}

impl Spell {
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout.filter(|t| !t.is_zero()).unwrap_or(default)
    }

    /// Shallow-merge `patch` into this spell. Validates first, so a rejected
    /// patch leaves the spell untouched.
    pub fn apply(&mut self, patch: SpellPatch) -> Result<()> {
        let source = match (patch.script, patch.script_file) {
            (None, None) => None,
            (script, script_file) => Some(ScriptSource::from_parts(script, script_file)?),
        };
        if let Some(name) = patch.name.as_deref() {
            if name.trim().is_empty() {
                return Err(SpellError::Configuration("spell name cannot be empty".into()));
            }
        }

        if let Some(source) = source {
            self.source = source;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(icon) = patch.icon {
            self.icon = Some(icon);
        }
        if let Some(args) = patch.args {
            self.args = args;
        }
        if let Some(ms) = patch.timeout_ms {
            // 0 resets the spell to the default timeout.
            self.timeout = timeout_from_ms(Some(ms));
        }
        if let Some(requires_input) = patch.requires_input {
            self.requires_input = requires_input;
        }
        if let Some(format) = patch.output_format {
            self.output_format = format;
        }
        if let Some(estimate) = patch.estimated_time {
            self.estimated_time = Some(estimate);
        }
        Ok(())
    }
}

/// On-disk / over-the-wire shape of a spell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// Milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_input: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
}

impl TryFrom<SpellRecord> for Spell {
    type Error = SpellError;

    fn try_from(r: SpellRecord) -> Result<Self> {
        if r.id.trim().is_empty() {
            return Err(SpellError::Configuration("spell id cannot be empty".into()));
        }
        let source = ScriptSource::from_parts(r.script, r.script_file)?;
        Ok(Spell {
            id: r.id,
            name: r.name,
            description: r.description,
            category: r.category,
            icon: r.icon,
            source,
            args: r.args.unwrap_or_default(),
            timeout: timeout_from_ms(r.timeout),
            requires_input: r.requires_input != Some(false),
            output_format: r.output_format.unwrap_or_default(),
            estimated_time: r.estimated_time,
        })
    }
}

impl From<Spell> for SpellRecord {
    fn from(s: Spell) -> Self {
        let (script, script_file) = s.source.into_parts();
        SpellRecord {
            id: s.id,
            name: s.name,
            description: s.description,
            category: s.category,
            icon: s.icon,
            script,
            script_file,
            args: if s.args.is_empty() { None } else { Some(s.args) },
            timeout: s.timeout.map(|d| d.as_millis() as u64),
            requires_input: Some(s.requires_input),
            output_format: Some(s.output_format),
            estimated_time: s.estimated_time,
        }
    }
}

/// Partial spell definition: input to `add_custom_spell` and `test_spell`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub script_file: Option<PathBuf>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default, rename = "timeout")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub requires_input: Option<bool>,
    #[serde(default)]
    pub output_format: Option<OutputFormat>,
    #[serde(default)]
    pub estimated_time: Option<String>,
}

impl SpellDraft {
    pub fn inline(script: impl Into<String>) -> Self {
        Self {
            script: Some(script.into()),
            ..Default::default()
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            script_file: Some(path.into()),
            ..Default::default()
        }
    }
}

/// Field-wise update for `update_spell`. Unset fields are left alone.
/// Setting `script` or `script_file` replaces the spell's source entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub script_file: Option<PathBuf>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default, rename = "timeout")]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub requires_input: Option<bool>,
    #[serde(default)]
    pub output_format: Option<OutputFormat>,
    #[serde(default)]
    pub estimated_time: Option<String>,
}
