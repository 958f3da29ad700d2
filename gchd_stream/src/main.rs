use std::process::ExitCode;

use clap::Parser;
use log::error;

use gchd::{shutdown, Config, ResolutionKey, RunFlag, ScriptDir};

/// Stream the Elgato Game Capture HD into a named pipe.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Output standard: 720p, 1080p, 576i, c576p, c720p, c1080i or c1080p
    #[arg(short, long, value_name = "RES", default_value_t = ResolutionKey::default())]
    resolution: ResolutionKey,
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let run_flag = RunFlag::new();
    if let Err(err) = shutdown::install(&run_flag) {
        error!("could not install signal handlers: {}", err);
        return ExitCode::FAILURE;
    }

    let config = Config::from_env();
    let scripts = ScriptDir::new(&config.script_dir);

    match gchd::run(config, args.resolution, &run_flag, rusb::Context::new, &scripts) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(err.exit_code()),
    }
}
