fn main() -> anyhow::Result<()> {
    neo_navigator::run()
}
