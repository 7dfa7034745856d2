//! Environment management commands: inspect, extend and remove the embedded
//! interpreter environment.

use anyhow::{bail, Result};

use super::AppContext;

/// `spellcast env info`
pub fn cmd_info(ctx: &AppContext) -> Result<()> {
    let info = ctx.resolve_environment()?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

/// `spellcast env install <package>`
pub fn cmd_install(ctx: &AppContext, package: &str) -> Result<()> {
    let provisioner = ctx.provisioner();
    let info = provisioner.resolve()?;
    if !provisioner.install_package(&info, package) {
        bail!("Failed to install {} into {}", package, info.interpreter.display());
    }
    eprintln!("✓ Installed {}", package);
    Ok(())
}

/// `spellcast env clean`
pub fn cmd_clean(ctx: &AppContext, dry_run: bool, force: bool) -> Result<()> {
    let provisioner = ctx.provisioner();
    let root = provisioner.layout().root().to_path_buf();

    let Some(size) = provisioner.clean(true)? else {
        eprintln!("No embedded environment found at {}", root.display());
        return Ok(());
    };

    eprintln!("🗂  Embedded environment: {} ({})", root.display(), format_size(size));

    if dry_run {
        eprintln!();
        eprintln!("(Dry run: no files removed. Remove --dry-run to delete.)");
        return Ok(());
    }

    if !force {
        eprint!("\nRemove the embedded environment? [y/N] ");
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            eprintln!("Cancelled.");
            return Ok(());
        }
    }

    match provisioner.clean(false) {
        Ok(_) => eprintln!("✓ Removed embedded environment, freed {}", format_size(size)),
        Err(e) => bail!("Failed to remove {}: {}", root.display(), e),
    }
    Ok(())
}

/// Format byte size to human-readable string.
fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
