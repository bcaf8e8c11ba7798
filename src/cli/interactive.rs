use clap::Parser;
use futures::{AsyncWriteExt, FutureExt};
use gcs_dashboard::controller::Event;
use rustyline_async::{Readline, SharedWriter};
use tokio::select;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug, PartialEq, Eq)]
#[clap(setting(clap::AppSettings::NoBinaryName))]
#[clap(rename_all = "kebab-case")]
enum Commands {
    /// Connect to the vehicle through the backend
    Connect,
    /// Close the vehicle connection
    Disconnect,
    /// Fetch telemetry now instead of waiting for the next poll
    Status,
    /// Print the latest telemetry in full
    Telemetry,
    /// Summarize the trail of the current session
    Trail,
    /// Check that the backend is running
    Ping,
    Exit,
}

impl Commands {
    fn event(&self) -> Option<Event> {
        match self {
            Commands::Connect => Some(Event::Connect),
            Commands::Disconnect => Some(Event::Disconnect),
            Commands::Status => Some(Event::CheckStatus),
            Commands::Telemetry => Some(Event::ShowTelemetry),
            Commands::Trail => Some(Event::ShowTrail),
            Commands::Ping => Some(Event::Ping),
            Commands::Exit => None,
        }
    }
}

fn parse(line: &str) -> Result<Commands, clap::Error> {
    Parser::try_parse_from(line.split_ascii_whitespace())
}

/// Runs one command line. Returns `false` once the operator asked to exit.
async fn execute(
    line: &str,
    stdout: &mut SharedWriter,
    actions: &flume::Sender<Event>,
) -> anyhow::Result<bool> {
    let request = match parse(line) {
        Ok(request) => request,
        Err(err) => {
            stdout.write_all(err.to_string().as_bytes()).await?;
            return Ok(true);
        }
    };

    match request.event() {
        Some(event) => {
            if let Err(err) = actions.send_async(event).await {
                error!("controller did not accept command: {:?}", err);
            }
            Ok(true)
        }
        None => {
            info!("exiting");
            Ok(false)
        }
    }
}

/// Lines of a command script, without blanks and `#` comments.
pub fn script_lines(script: &str) -> Vec<String> {
    script
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

pub async fn run_interactive_cli(
    mut editor: Readline,
    mut stdout: SharedWriter,
    script: Vec<String>,
    actions: flume::Sender<Event>,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    for line in script {
        stdout.write_all(format!("gcs> {}\n", line).as_bytes()).await?;

        if !execute(&line, &mut stdout, &actions).await? {
            cancellation_token.cancel();
            return Ok(());
        }
    }

    loop {
        select! {
            _ = cancellation_token.cancelled() => {
                break;
            }
            result = editor.readline().fuse() => {
                match result {
                    Ok(line) => {
                        stdout.write_all(format!("gcs> {}\n", line).as_bytes()).await?;

                        if line.trim().is_empty() {
                            continue;
                        }

                        let keep_going = execute(&line, &mut stdout, &actions).await?;
                        editor.add_history_entry(line);

                        if !keep_going {
                            break;
                        }
                    }
                    Err(err) => {
                        error!("interactive error: {:#?}", err);
                        break;
                    }
                };
            }
        }
    }

    cancellation_token.cancel();

    Ok(())
}
