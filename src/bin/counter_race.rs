use ordering_lab::cli;
use ordering_lab::CounterMode;

fn main() -> anyhow::Result<()> {
    cli::run::<CounterMode>()
}
