//! readaloud CLI binary entry point.

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use readaloud::cli::{parse_prompt, Cli, Commands, PromptAction, SpeakArgs, PROMPT_HELP};
use readaloud::config::NarrationConfig;
use readaloud::playback::{Narrator, PlaybackController, PlaybackSnapshot};
use readaloud::rate::RateLabel;
use readaloud::source::{self, FileTextSource, HttpTextSource, TextSource};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Speak(args) => handle_speak(config, args).await,
            Commands::Rates => {
                print_rates();
                Ok(())
            }
        },
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load_config(path: Option<&std::path::Path>) -> readaloud::error::Result<NarrationConfig> {
    match path {
        Some(path) => NarrationConfig::load(path),
        None => {
            let default_path = NarrationConfig::default_path();
            if default_path.exists() {
                NarrationConfig::load(&default_path)
            } else {
                Ok(NarrationConfig::from_env())
            }
        }
    }
}

fn print_rates() {
    for label in RateLabel::ALL {
        println!("{label:>6}  engine {:.2}", label.engine_value());
    }
}

async fn handle_speak(
    mut config: NarrationConfig,
    args: SpeakArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(rate) = &args.rate {
        config.rate = RateLabel::parse_label(rate)?;
    }
    if let Some(engine) = args.engine {
        config.engine = engine;
    }

    let text_source: Box<dyn TextSource> = match (&args.file, args.url.as_ref().or(config.text_url.as_ref())) {
        (Some(path), _) => Box::new(FileTextSource::new(path.clone())),
        (None, Some(url)) => Box::new(HttpTextSource::new(url.clone())),
        (None, None) => return Err("pass --file or --url (or set READALOUD_TEXT_URL)".into()),
    };

    let engine = config.build_engine()?;
    let mut controller = PlaybackController::with_config(engine, &config);
    if let Err(error) = source::load_into(text_source.as_ref(), &mut controller).await {
        // Controls stay disabled; there is nothing to narrate.
        return Err(error.into());
    }
    if controller.text().is_none() {
        return Err("narration text is empty".into());
    }

    let narrator = Narrator::spawn(controller);
    let handle = narrator.handle();

    let json = args.json;
    let mut snapshots = handle.watch();
    let printer = tokio::spawn(async move {
        let mut last = snapshots.borrow().clone();
        while snapshots.changed().await.is_ok() {
            let current = snapshots.borrow_and_update().clone();
            if current.phase != last.phase || current.rate != last.rate {
                println!("{}", describe(&current, json));
            }
            last = current;
        }
    });

    println!("{PROMPT_HELP}");
    if args.autoplay {
        handle.play().await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_prompt(&line) {
            None => continue,
            Some(Err(error)) => eprintln!("{error}"),
            Some(Ok(PromptAction::Quit)) => break,
            Some(Ok(PromptAction::Help)) => println!("{PROMPT_HELP}"),
            Some(Ok(PromptAction::Status)) => println!("{}", describe(&handle.snapshot(), json)),
            Some(Ok(PromptAction::Command(command))) => {
                if let Err(error) = handle.send(command).await {
                    eprintln!("{error}");
                }
            }
        }
    }

    narrator.shutdown().await?;
    printer.abort();
    Ok(())
}

fn describe(snapshot: &PlaybackSnapshot, json: bool) -> String {
    if json {
        if let Ok(line) = serde_json::to_string(snapshot) {
            return line;
        }
    }
    format!(
        "[{}] {}/{} chars at {} ({})",
        snapshot.phase,
        snapshot.offset,
        snapshot.text_len,
        snapshot.rate,
        snapshot.button_label()
    )
}
