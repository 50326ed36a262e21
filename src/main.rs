mod gui;

use grid_creator::config::AppConfig;
use grid_creator::logging::init_logging;

use gui::app::run_app;

fn main() {
    let config = AppConfig::load_or_default(".");
    init_logging(&config.logging.level);

    if let Err(e) = pollster::block_on(run_app(config)) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
