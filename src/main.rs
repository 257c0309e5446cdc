use clap::Parser;
use log::LevelFilter;

use pagestack::build;
use pagestack::config::Config;

fn main() {
    let config = Config::parse();

    let level = if config.debug {
        LevelFilter::Debug
    } else if config.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();

    match build::build_site(&config) {
        Ok(stats) => {
            println!(
                "{} rendered, {} copied, {} fragments, {} redirects, {} failed",
                stats.rendered,
                stats.copied,
                stats.fragments,
                stats.redirects,
                stats.failed,
            );
        }
        Err(err) => {
            log::error!("{}", err);
            std::process::exit(1);
        }
    }
}
