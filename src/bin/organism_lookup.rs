use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use dialoguer::Input;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use organism_lookup::app::LookupApp;
use organism_lookup::config::{ConfigLoader, Overrides};
use organism_lookup::domain::AlignMode;
use organism_lookup::entrez::EntrezHttpClient;
use organism_lookup::error::LookupError;
use organism_lookup::output::{JsonOutput, OutputMode, TextOutput};

#[derive(Parser)]
#[command(name = "organism-lookup")]
#[command(about = "Look up the source organism of each accession number in a CSV file via NCBI")]
#[command(version, author, arg_required_else_help = true)]
struct Cli {
    /// Path to a CSV file with the Accession Numbers in the SECOND column.
    input_file_path: String,

    /// Your email. Will be used to track your usage with NCBI so they can let
    /// you know before they block if you are using it too much.
    #[arg(long, env = "NCBI_EMAIL")]
    email: Option<String>,

    /// Assign names by position over all rows, as older versions did.
    #[arg(long)]
    positional: bool,

    /// Print a JSON summary instead of progress lines.
    #[arg(long)]
    json: bool,

    /// Path to a JSON config file.
    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        if let Some(LookupError::InputNotFound(path)) = report.downcast_ref::<LookupError>() {
            println!("Couldn't find file: {path}.");
            return ExitCode::SUCCESS;
        }
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<LookupError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &LookupError) -> u8 {
    if error.is_remote() { 3 } else { 1 }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let config_path = cli.config.as_deref().map(Utf8PathBuf::from);
    let file = ConfigLoader::load(config_path.as_deref())?;

    let email = match cli.email.or_else(|| file.email.clone()) {
        Some(email) if !email.trim().is_empty() => email,
        _ => prompt_email()?,
    };
    let api_key = std::env::var("NCBI_API_KEY").ok();
    let overrides = Overrides {
        email: Some(email),
        api_key,
        align: cli.positional.then_some(AlignMode::Positional),
    };
    let config = ConfigLoader::resolve(file, overrides)?;

    let client = EntrezHttpClient::new(config.entrez.clone())?;
    let app = LookupApp::new(client, config);
    let input = Utf8PathBuf::from(cli.input_file_path);

    match output_mode {
        OutputMode::Text => {
            app.run(&input, &TextOutput)?;
        }
        OutputMode::Json => {
            let summary = app.run(&input, &JsonOutput)?;
            JsonOutput::print_summary(&summary).into_diagnostic()?;
        }
    }
    Ok(())
}

fn prompt_email() -> Result<String, LookupError> {
    Input::<String>::new()
        .with_prompt("Email")
        .interact_text()
        .map_err(|err| LookupError::Prompt(err.to_string()))
}
