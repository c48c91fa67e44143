use clap::Parser;

fn main() -> anyhow::Result<()> {
    pcremote_lib::run(pcremote_lib::Cli::parse())
}
