use ordering_lab::cli;
use ordering_lab::StoreBufferMode;

fn main() -> anyhow::Result<()> {
    cli::run::<StoreBufferMode>()
}
