//! # schema-studio
//!
//! Headless host for the schema panel: it plays the editor's part (focus, save, format requests)
//! and prints what the panel would show.
//!
//! ```bash
//! schema-studio check schemas/*.json
//! schema-studio check --json person.schema.json
//! SCHEMA_STUDIO_TOOL=/opt/bin/jsonschema schema-studio format person.schema.json
//! RUST_LOG=schema_studio_core=debug schema-studio check person.schema.json
//! ```
//!
//! `check` exits with 1 when any document has metaschema errors or could not be parsed, and 2 when
//! the tool could not be run for some document.

mod cli;
mod report;

use anyhow::{Context, bail};
use clap::Parser;
use cli::{Cli, Command};
use report::Tally;
use schema_studio_core::{
    Channel, FocusedEditor, HostAction, HostCommand, PanelController, PanelMessage, PanelPhase,
    WebviewMessage,
};
use schema_studio_tool::ProcessTool;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let controller = PanelController::new(ProcessTool::new(cli.tool_config()), cli.session_options());

    let code = match &cli.command {
        Command::Check { files, json } => check(&controller, files, *json).await?,
        Command::Format { file } => {
            format(&controller, file).await?;
            ExitCode::SUCCESS
        }
    };

    controller.dispose();
    Ok(code)
}

async fn open(controller: &PanelController<ProcessTool>, file: &Path) -> anyhow::Result<PathBuf> {
    let path = file
        .canonicalize()
        .with_context(|| format!("cannot open {}", file.display()))?;
    controller
        .execute(
            HostCommand::OpenPanel,
            Some(FocusedEditor::File(path.clone())),
        )
        .await;
    Ok(path)
}

async fn check(
    controller: &PanelController<ProcessTool>,
    files: &[PathBuf],
    json: bool,
) -> anyhow::Result<ExitCode> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut tally = Tally::default();

    for file in files {
        let path = open(controller, file).await?;
        let session = controller.session();

        if json {
            let message = PanelMessage::Update {
                state: session.view().clone(),
            };
            writeln!(out, "{}", serde_json::to_string(&message)?)?;
        }

        let Some(focused) = session.focused() else {
            tracing::warn!(file = %file.display(), "skipping: not a .json, .yaml or .yml document");
            continue;
        };

        if session.phase() == PanelPhase::Failed {
            tally.failures += 1;
            let reason = session
                .view()
                .lint_result
                .as_ref()
                .map(|result| result.raw_output.as_str())
                .unwrap_or("unknown failure");
            tracing::error!(file = %path.display(), %reason, "analysis failed");
            continue;
        }

        let lint = session.diagnostics().channel(Channel::Lint).get(&focused.uri);
        let metaschema = session
            .diagnostics()
            .channel(Channel::Metaschema)
            .get(&focused.uri);
        tally.add(&lint);
        tally.add(&metaschema);
        if session.view().has_unrecoverable_parse_error {
            tally.unparsable += 1;
        }

        if !json {
            report::render(&mut out, file, &metaschema)?;
            report::render(&mut out, file, &lint)?;
            if let Some(health) = session
                .view()
                .lint_result
                .as_ref()
                .and_then(|result| result.health)
            {
                writeln!(out, "{}: health {health}/100", file.display())?;
            }
        }
    }

    tracing::info!(
        errors = tally.errors,
        warnings = tally.warnings,
        unparsable = tally.unparsable,
        failures = tally.failures,
        "check finished"
    );

    Ok(ExitCode::from(tally.status()))
}

async fn format(controller: &PanelController<ProcessTool>, file: &Path) -> anyhow::Result<()> {
    let path = open(controller, file).await?;
    if controller.session().focused().is_none() {
        bail!("{} is not a .json, .yaml or .yml document", file.display());
    }

    match controller.handle_message(WebviewMessage::FormatSchema).await {
        HostAction::ShowError { message } => bail!("{}: {message}", file.display()),
        _ => {
            tracing::info!(file = %path.display(), "formatted");
            Ok(())
        }
    }
}
