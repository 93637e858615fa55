fn main() -> anyhow::Result<()> {
    resource_server::cli::run_cli()
}
