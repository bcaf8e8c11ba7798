use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use gcs_dashboard::{
    backend::BackendClient, config::DashboardConfig, controller, task::Task,
    view::TerminalDashboard,
};
use rustyline_async::{Readline, SharedWriter};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::metadata::LevelFilter;
use tracing_subscriber::{filter::Targets, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::cli::interactive::{run_interactive_cli, script_lines};

#[macro_use]
extern crate tracing;

mod cli;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // setup colorful backtraces
    color_backtrace::install();

    // set up logging and interactive line editor
    let (editor, stdout) =
        Readline::new("gcs> ".into()).context("failed to create interactive editor")?;

    let mut targets = tracing_subscriber::filter::Targets::new().with_default(LevelFilter::INFO);

    if let Ok(directives) = std::env::var("RUST_LOG") {
        for directive in directives.split(',') {
            if let Some((target, level)) = directive.split_once('=') {
                targets = targets.with_target(
                    target,
                    level.parse::<LevelFilter>().context("invalid log level")?,
                );
            } else {
                targets = targets.with_default(
                    directive
                        .parse::<LevelFilter>()
                        .context("invalid log level")?,
                );
            }
        }
    }

    let (writer, _guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::hourly("logs", "gcs-dashboard"));

    let reg = tracing_subscriber::registry();

    #[cfg(tokio_unstable)]
    let reg = reg.with(console_subscriber::spawn());

    reg
        // writer that outputs to console
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer({
                    let stdout = stdout.clone();
                    move || stdout.clone()
                })
                .with_filter(targets),
        )
        // writer that outputs to files
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(
                    Targets::new().with_targets(vec![("gcs_dashboard", LevelFilter::DEBUG)]),
                ),
        )
        .init();

    let main_args: cli::args::MainArgs = cli::args::MainArgs::parse();

    let mut config = match &main_args.config {
        Some(path) => {
            debug!("reading config from {:?}", path);
            DashboardConfig::read_from_path(path).context("failed to read config file")?
        }
        None => DashboardConfig::read().context("failed to read config")?,
    };

    if let Some(address) = main_args.backend {
        config.backend.address = address;
    }

    if let Some(interval_ms) = main_args.interval {
        anyhow::ensure!(interval_ms > 0, "poll interval must be greater than zero");
        config.poll.interval_ms = interval_ms;
    }

    let script = match &main_args.script {
        Some(path) => script_lines(
            &std::fs::read_to_string(path)
                .with_context(|| format!("failed to read script {:?}", path))?,
        ),
        None => Vec::new(),
    };

    run_tasks(config, script, editor, stdout).await
}

async fn run_tasks(
    config: DashboardConfig,
    script: Vec<String>,
    editor: Readline,
    stdout: SharedWriter,
) -> anyhow::Result<()> {
    let cancellation_token = CancellationToken::new();

    ctrlc::set_handler({
        let cancellation_token = cancellation_token.clone();
        move || {
            info!("received interrupt, shutting down");
            cancellation_token.cancel();
        }
    })
    .context("could not set ctrl+c handler")?;

    debug!("using backend at {}", config.backend.address);
    let backend = BackendClient::new(&config.backend).context("failed to create backend client")?;

    debug!("initializing controller task");
    let controller = controller::create_task(
        &config,
        Arc::new(backend),
        TerminalDashboard::new(stdout.clone()),
    );
    let actions = controller.actions();

    let mut join_set = JoinSet::new();

    join_set.spawn(run_interactive_cli(
        editor,
        stdout,
        script,
        actions,
        cancellation_token.clone(),
    ));

    let task: Box<dyn Task + Send> = Box::new(controller);
    debug!("starting {} task", task.name());
    join_set.spawn(task.run(cancellation_token.clone()));

    while let Some(res) = join_set.join_next().await {
        // if task panicked, then will be Some(Err)
        // if task terminated w/ error, then will be Some(Ok(Err))
        // need to propagate errors in both cases

        match res {
            Err(err) => {
                cancellation_token.cancel();
                return Err(err).context("task failed");
            }
            Ok(Err(err)) => {
                cancellation_token.cancel();
                return Err(err).context("task terminated with error");
            }
            _ => {
                info!("exited task");
            }
        }
    }

    Ok(())
}
