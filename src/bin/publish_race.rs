use ordering_lab::cli;
use ordering_lab::PublishMode;

fn main() -> anyhow::Result<()> {
    cli::run::<PublishMode>()
}
