//! Command-line interface parsing and the interactive conversation loop.

use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Read, Write};

use clap::Parser;

use crate::core::config::Config;
use crate::core::conversation::Conversation;
use crate::core::providers::resolve_model;
use crate::i18n::{Language, Text, Translator};

#[derive(Parser)]
#[command(name = "askai", version)]
#[command(about = "A lightweight command-line AI assistant")]
#[command(
    long_about = "Askai sends your text to a hosted AI chat API and prints the reply, \
streaming it as it arrives.\n\n\
Providers are configured in a TOML file (an `askai.toml` in the working \
directory wins over the platform config directory); a provider whose stored \
key is empty falls back to the {PROVIDER}_API_KEY environment variable.\n\n\
Piped input is included in the first query as fenced context:\n\
  git diff | askai \"review this change\""
)]
pub struct Args {
    /// Query to send; starts an interactive session when omitted
    pub query: Vec<String>,

    /// Provider to use instead of the configured default
    #[arg(short, long, value_name = "PROVIDER")]
    pub model: Option<String>,

    /// Print the reply in one piece instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Answer the initial query and exit
    #[arg(long)]
    pub once: bool,

    /// Interface language (en, zh)
    #[arg(long, value_name = "LANG")]
    pub lang: Option<String>,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::load()?;
    let translator = Translator::new(Language::resolve(
        args.lang.as_deref().or(config.language.as_deref()),
    ));

    let provider = args
        .model
        .clone()
        .unwrap_or_else(|| config.default_model.clone());
    let model = match resolve_model(&provider, &config) {
        Ok(model) => model,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(err.exit_code());
        }
    };

    let mut conversation = Conversation::new(model, config.max_history);
    let stream = !args.no_stream && config.stream_output;

    let initial_query = build_initial_query(&args.query)?;

    if !initial_query.trim().is_empty() {
        run_turn(&mut conversation, &initial_query, stream).await;
    } else if args.once {
        eprintln!("{}", translator.text(Text::OnceNeedsQuery));
        std::process::exit(1);
    }

    if args.once {
        return Ok(());
    }

    // After consuming piped stdin the terminal must be reopened for
    // interactive input; without one the session ends here.
    let reader: Box<dyn BufRead> = if io::stdin().is_terminal() {
        Box::new(BufReader::new(io::stdin()))
    } else {
        match open_terminal() {
            Some(tty) => Box::new(tty),
            None => return Ok(()),
        }
    };

    interactive_loop(&mut conversation, reader, stream, &translator).await
}

/// Combine piped stdin (fenced, so the model sees it as verbatim material)
/// with the argv query.
fn build_initial_query(query: &[String]) -> io::Result<String> {
    let mut parts = String::new();

    if !io::stdin().is_terminal() {
        let mut piped = String::new();
        io::stdin().read_to_string(&mut piped)?;
        let piped = piped.trim();
        if !piped.is_empty() {
            parts.push_str(&format!("```\n{piped}\n```\n\n"));
        }
    }

    if !query.is_empty() {
        parts.push_str(&query.join(" "));
    }

    Ok(parts)
}

#[cfg(unix)]
fn open_terminal() -> Option<BufReader<File>> {
    File::open("/dev/tty").ok().map(BufReader::new)
}

#[cfg(windows)]
fn open_terminal() -> Option<BufReader<File>> {
    File::open("CONIN$").ok().map(BufReader::new)
}

async fn interactive_loop(
    conversation: &mut Conversation,
    mut reader: Box<dyn BufRead>,
    stream: bool,
    translator: &Translator,
) -> Result<(), Box<dyn Error>> {
    println!("{}", translator.text(Text::InteractiveIntro));
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            // EOF behaves like quit.
            println!("{}", translator.text(Text::Goodbye));
            return Ok(());
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            println!("{}", translator.text(Text::Goodbye));
            return Ok(());
        }
        run_turn(conversation, input, stream).await;
    }
}

async fn run_turn(conversation: &mut Conversation, text: &str, stream: bool) {
    if stream {
        let mut sink = |fragment: &str| {
            print!("{fragment}");
            let _ = io::stdout().flush();
        };
        conversation.send_message(text, true, &mut sink).await;
        println!("\n");
    } else {
        let mut sink = |_fragment: &str| {};
        if let Some(reply) = conversation.send_message(text, false, &mut sink).await {
            println!("\n{reply}\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_parse_query_and_flags() {
        let args = Args::parse_from(["askai", "-m", "qwen", "--no-stream", "what", "is", "rust"]);
        assert_eq!(args.model.as_deref(), Some("qwen"));
        assert!(args.no_stream);
        assert!(!args.once);
        assert_eq!(args.query, vec!["what", "is", "rust"]);
    }

    #[test]
    fn args_default_to_interactive_streaming() {
        let args = Args::parse_from(["askai"]);
        assert!(args.query.is_empty());
        assert!(args.model.is_none());
        assert!(!args.no_stream);
        assert!(args.lang.is_none());
    }

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }
}
