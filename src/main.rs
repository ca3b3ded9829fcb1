fn main() -> anyhow::Result<()> {
    autoscript::run()
}
