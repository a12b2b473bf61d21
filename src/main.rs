use anyhow::Result;
use log::error;
use std::process::ExitCode;

use orrery::{config::SceneConfig, OrreryApp};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Fatal: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    OrreryApp::new(SceneConfig::default())?.run()
}
