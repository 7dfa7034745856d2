fn main() -> anyhow::Result<()> {
    spellcast::run_cli()
}
