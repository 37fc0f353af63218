use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "pdf-speech-translator",
    version,
    about = "Translate PDF documents in place and voice the translation"
)]
struct Cli {
    /// Address to listen on (overrides [server] addr)
    #[arg(long = "addr")]
    addr: Option<String>,

    /// PDF to translate once instead of starting the server
    #[arg(short = 'd', long = "data")]
    data: Option<PathBuf>,

    /// Target language for --data (e.g. hi, ta, bn)
    #[arg(short = 'l', long = "lang")]
    lang: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    pdf_speech_translator::logging::init(cli.verbose)?;

    let config = pdf_speech_translator::Config {
        settings_path: cli.read_settings,
        addr: cli.addr,
    };

    match cli.data {
        Some(path) => {
            let lang = cli
                .lang
                .ok_or_else(|| anyhow!("--lang is required with --data"))?;
            let report = pdf_speech_translator::translate_file(config, &path, &lang).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        None => pdf_speech_translator::serve(config).await,
    }
}
