use anyhow::Result;
use clap::Parser;
use log::debug;
use whisper_transcribe::cli::{transcribe, Cli, USAGE};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();

    if args.list_models {
        return transcribe::list_models(&args);
    }

    let audio_path = match args.audio_path() {
        Ok(path) => path.to_path_buf(),
        Err(e) => {
            debug!("{}", e);
            println!("{}", USAGE);
            std::process::exit(1);
        }
    };

    transcribe::run(&args, &audio_path)
}
