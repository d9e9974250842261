use ordering_lab::cli;
use ordering_lab::PointerMode;

fn main() -> anyhow::Result<()> {
    cli::run::<PointerMode>()
}
