mod cli;

use signpose::logging;

fn main() -> anyhow::Result<()> {
    logging::init();
    cli::run()
}
