use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use rliked::clients::{
    StdinPrompter,
    browser::LIKED_SONGS_URL,
    credentials::Prompter,
    errors::Result,
};
use std::path::PathBuf;

use crate::extractor;

#[derive(Parser)]
#[command(name = "rliked")]
#[command(version, about = "Export Spotify liked songs to CSV", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract liked songs to CSV
    Extract {
        #[arg(long, value_enum, default_value_t = Source::Api)]
        source: Source,
        /// Directory for the Web API CSV files
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Upper bound on scroll steps in the browser
        #[arg(long)]
        max_scrolls: Option<usize>,
    },
    /// Open the liked songs page in the default browser
    Open,
}

#[derive(Clone, Copy, ValueEnum)]
enum Source {
    Api,
    Browser,
}

// No subcommand shows the interactive menu
pub async fn run() -> Result<bool> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Extract {
            source,
            output_dir,
            max_scrolls,
        }) => {
            let config = extractor::ConfigBuilder::new()
                .api_output_dir(output_dir)
                .max_scrolls(max_scrolls)
                .build()?;
            Ok(extract(source, &config, &mut StdinPrompter).await)
        }
        Some(Commands::Open) => Ok(open_liked_songs()),
        None => menu(&mut StdinPrompter).await,
    }
}

async fn extract<P: Prompter>(source: Source, config: &extractor::Config, prompter: &mut P) -> bool {
    match source {
        Source::Api => extractor::run_api(config, prompter).await,
        Source::Browser => extractor::run_browser(config).await,
    }
}

fn open_liked_songs() -> bool {
    match webbrowser::open(LIKED_SONGS_URL) {
        Ok(()) => {
            info!("Opened {LIKED_SONGS_URL}");
            true
        }
        Err(e) => {
            error!("Could not open a browser: {e}");
            false
        }
    }
}

const MENU: &str = "\
Spotify Liked Songs Extractor

What would you like to do?

[1] Extract liked songs to CSV (browser)
[2] Extract liked songs to CSV (Web API)
[3] Open Spotify Liked Songs in browser
[4] Quit
";

async fn menu<P: Prompter>(prompter: &mut P) -> Result<bool> {
    prompter.show(MENU);
    loop {
        let choice = prompter.prompt("Enter a number")?;
        let source = match choice.as_str() {
            "1" => Source::Browser,
            "2" => Source::Api,
            "3" => return Ok(open_liked_songs()),
            "4" => return Ok(true),
            _ => {
                prompter.show("Please select one of the available options: 1, 2, 3, 4");
                continue;
            }
        };
        let config = extractor::ConfigBuilder::new().build()?;
        return Ok(extract(source, &config, prompter).await);
    }
}
