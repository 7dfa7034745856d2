//! Built-in spell catalog.
//!
//! Built-ins are re-registered on every startup and never written to the
//! spell book. They are recognised by id prefix, so custom ids must not start
//! with any of [`BUILTIN_IDS`].

use std::path::Path;
use std::time::Duration;

use super::model::{OutputFormat, ScriptSource, Spell};

pub const BUILTIN_IDS: &[&str] = &[
    "text-analyzer",
    "data-processor",
    "word-counter",
    "text-cleaner",
    "json-formatter",
    "url-extractor",
    "email-extractor",
    "list-sorter",
    "duplicate-remover",
];

/// Built-ins bound to slots 1..=5 when no spell book exists yet.
pub const DEFAULT_QUICK_SLOTS: &[&str] = &[
    "text-analyzer",
    "data-processor",
    "word-counter",
    "text-cleaner",
    "json-formatter",
];

/// File-based built-ins, shipped inside the binary and written to the scripts dir.
pub const BUILTIN_SCRIPT_FILES: &[(&str, &str)] = &[
    (
        "text_analyzer.py",
        include_str!("../../resources/scripts/text_analyzer.py"),
    ),
    (
        "data_processor.py",
        include_str!("../../resources/scripts/data_processor.py"),
    ),
];

pub fn is_builtin(id: &str) -> bool {
    BUILTIN_IDS.iter().any(|b| id.starts_with(b))
}

/// Write the file-based built-in scripts into `scripts_dir`.
/// Files whose content already matches are left alone.
pub fn materialize_scripts(scripts_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(scripts_dir)?;
    for (name, content) in BUILTIN_SCRIPT_FILES {
        let path = scripts_dir.join(name);
        let current = std::fs::read_to_string(&path).ok();
        if current.as_deref() != Some(*content) {
            std::fs::write(&path, content)?;
            tracing::debug!(path = %path.display(), "materialized built-in script");
        }
    }
    Ok(())
}

const WORD_COUNTER: &str = r#"import sys, json
text = sys.stdin.read().strip()
print(json.dumps({
    "words": len(text.split()),
    "characters": len(text),
    "characters_no_spaces": len(text.replace(" ", "")),
    "lines": len(text.splitlines()) if text else 0,
}))
"#;

const TEXT_CLEANER: &str = r#"import sys, re
text = sys.stdin.read()
paragraphs = [re.sub(r"[ \t]+", " ", p).strip() for p in re.split(r"\n\s*\n", text)]
print("\n\n".join(p for p in paragraphs if p))
"#;

const JSON_FORMATTER: &str = r#"import sys, json
try:
    data = json.loads(sys.stdin.read())
except json.JSONDecodeError as e:
    print(f"Invalid JSON: {e}", file=sys.stderr)
    sys.exit(1)
print(json.dumps(data, indent=2, sort_keys=True, ensure_ascii=False))
"#;

const URL_EXTRACTOR: &str = r#"import sys, re, json
urls = re.findall(r"https?://[^\s<>\"']+", sys.stdin.read())
print(json.dumps({"urls": urls, "count": len(urls), "unique_urls": sorted(set(urls))}))
"#;

const EMAIL_EXTRACTOR: &str = r#"import sys, re, json
emails = re.findall(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b", sys.stdin.read())
print(json.dumps({
    "emails": emails,
    "count": len(emails),
    "unique_emails": sorted(set(emails)),
    "domains": sorted({e.split("@")[1] for e in emails}),
}))
"#;

const LIST_SORTER: &str = r#"import sys
lines = [l.strip() for l in sys.stdin.read().splitlines() if l.strip()]
print("\n".join(sorted(lines)))
"#;

const DUPLICATE_REMOVER: &str = r#"import sys
lines = [l.strip() for l in sys.stdin.read().splitlines() if l.strip()]
print("\n".join(dict.fromkeys(lines)))
"#;

struct BuiltinDef {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    category: &'static str,
    icon: &'static str,
    source: BuiltinSource,
    output_format: OutputFormat,
    estimated_time: &'static str,
    timeout_ms: u64,
}

enum BuiltinSource {
    Inline(&'static str),
    File(&'static str),
}

const BUILTINS: &[BuiltinDef] = &[
    BuiltinDef {
        id: "text-analyzer",
        name: "Text Analyzer",
        description: "Analyze text for word count, complexity, and insights",
        category: "analysis",
        icon: "📊",
        source: BuiltinSource::File("text_analyzer.py"),
        output_format: OutputFormat::Json,
        estimated_time: "< 1 second",
        timeout_ms: 10_000,
    },
    BuiltinDef {
        id: "data-processor",
        name: "Data Processor",
        description: "Process and analyze CSV, JSON, and other data formats",
        category: "data",
        icon: "🔄",
        source: BuiltinSource::File("data_processor.py"),
        output_format: OutputFormat::Json,
        estimated_time: "1-3 seconds",
        timeout_ms: 15_000,
    },
    BuiltinDef {
        id: "word-counter",
        name: "Quick Word Count",
        description: "Count words, characters, and lines",
        category: "text",
        icon: "🔢",
        source: BuiltinSource::Inline(WORD_COUNTER),
        output_format: OutputFormat::Json,
        estimated_time: "< 1 second",
        timeout_ms: 5_000,
    },
    BuiltinDef {
        id: "text-cleaner",
        name: "Text Cleaner",
        description: "Clean and format text (remove extra spaces, fix line breaks)",
        category: "text",
        icon: "🧹",
        source: BuiltinSource::Inline(TEXT_CLEANER),
        output_format: OutputFormat::Replace,
        estimated_time: "< 1 second",
        timeout_ms: 5_000,
    },
    BuiltinDef {
        id: "json-formatter",
        name: "JSON Formatter",
        description: "Pretty-print and validate JSON data",
        category: "data",
        icon: "📝",
        source: BuiltinSource::Inline(JSON_FORMATTER),
        output_format: OutputFormat::Replace,
        estimated_time: "< 1 second",
        timeout_ms: 5_000,
    },
    BuiltinDef {
        id: "url-extractor",
        name: "URL Extractor",
        description: "Extract all URLs from text",
        category: "text",
        icon: "🔗",
        source: BuiltinSource::Inline(URL_EXTRACTOR),
        output_format: OutputFormat::Json,
        estimated_time: "< 1 second",
        timeout_ms: 5_000,
    },
    BuiltinDef {
        id: "email-extractor",
        name: "Email Extractor",
        description: "Extract all email addresses from text",
        category: "text",
        icon: "📧",
        source: BuiltinSource::Inline(EMAIL_EXTRACTOR),
        output_format: OutputFormat::Json,
        estimated_time: "< 1 second",
        timeout_ms: 5_000,
    },
    BuiltinDef {
        id: "list-sorter",
        name: "List Sorter",
        description: "Sort lines of text alphabetically",
        category: "text",
        icon: "📋",
        source: BuiltinSource::Inline(LIST_SORTER),
        output_format: OutputFormat::Replace,
        estimated_time: "< 1 second",
        timeout_ms: 5_000,
    },
    BuiltinDef {
        id: "duplicate-remover",
        name: "Duplicate Remover",
        description: "Remove duplicate lines from text",
        category: "text",
        icon: "🗑️",
        source: BuiltinSource::Inline(DUPLICATE_REMOVER),
        output_format: OutputFormat::Replace,
        estimated_time: "< 1 second",
        timeout_ms: 5_000,
    },
];

/// The built-in spells, with file-based ones resolved against `scripts_dir`.
pub fn builtin_spells(scripts_dir: &Path) -> Vec<Spell> {
    BUILTINS
        .iter()
        .map(|def| Spell {
            id: def.id.to_string(),
            name: def.name.to_string(),
            description: def.description.to_string(),
            category: def.category.to_string(),
            icon: Some(def.icon.to_string()),
            source: match def.source {
                BuiltinSource::Inline(code) => ScriptSource::Inline(code.to_string()),
                BuiltinSource::File(name) => ScriptSource::File(scripts_dir.join(name)),
            },
            args: Vec::new(),
            timeout: Some(Duration::from_millis(def.timeout_ms)),
            requires_input: true,
            output_format: def.output_format,
            estimated_time: Some(def.estimated_time.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_matches_id_list() {
        let spells = builtin_spells(Path::new("/scripts"));
        let ids: Vec<&str> = spells.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, BUILTIN_IDS);
        for slot_id in DEFAULT_QUICK_SLOTS {
            assert!(BUILTIN_IDS.contains(slot_id));
        }
    }

    #[test]
    fn test_file_builtins_point_into_scripts_dir() {
        let spells = builtin_spells(Path::new("/scripts"));
        let analyzer = spells.iter().find(|s| s.id == "text-analyzer").unwrap();
        assert_eq!(
            analyzer.source,
            ScriptSource::File(Path::new("/scripts").join("text_analyzer.py"))
        );
    }

    #[test]
    fn test_is_builtin_uses_prefix() {
        assert!(is_builtin("word-counter"));
        assert!(is_builtin("word-counter-v2"));
        assert!(!is_builtin("custom-123"));
    }

    #[test]
    fn test_materialize_scripts_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        materialize_scripts(dir.path()).unwrap();
        for (name, content) in BUILTIN_SCRIPT_FILES {
            let written = std::fs::read_to_string(dir.path().join(name)).unwrap();
            assert_eq!(&written, content);
        }
        // Idempotent.
        materialize_scripts(dir.path()).unwrap();
    }
}
