fn main() -> anyhow::Result<()> {
    drillbox::cli::run()
}
