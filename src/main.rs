use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use dashview::cli::CliArgs;
use dashview::config::{self, DashConfig, expand_path};
use dashview::controller::Controller;
use dashview::domain::DashError;
use dashview::dump;
use dashview::model::{Model, Status};
use dashview::source::{DummyJsonSource, FileSource, RecordSource};
use dashview::ui::TableUI;

const DEFAULT_LOG_FILE: &str = "dashview.log";

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(&args) {
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

enum LogTarget {
    Off,
    Stderr,
    File(PathBuf),
}

/// The terminal belongs to the ui, so logs go to a file. Without a log file
/// and without `-v` nothing is logged.
fn init_logging(config: &DashConfig, args: &CliArgs) -> Result<(), DashError> {
    let target = match (&config.log_file, args.verbose, args.dump) {
        (Some(path), _, _) => LogTarget::File(expand_path(path)),
        (None, 0, _) => LogTarget::Off,
        (None, _, true) => LogTarget::Stderr,
        (None, _, false) => LogTarget::File(PathBuf::from(DEFAULT_LOG_FILE)),
    };
    let filter = match args.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dashview=info")),
        1 => EnvFilter::new("dashview=debug"),
        _ => EnvFilter::new("dashview=trace"),
    };

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());
    match target {
        LogTarget::Off => {}
        LogTarget::Stderr => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .init();
        }
    }
    Ok(())
}

fn make_source(config: &DashConfig) -> Result<Arc<dyn RecordSource>, DashError> {
    match &config.data_path {
        Some(path) => Ok(Arc::new(FileSource::new(expand_path(path)))),
        None => Ok(Arc::new(DummyJsonSource::new(
            &config.base_url,
            config.fetch_limit,
        )?)),
    }
}

fn run(args: &CliArgs) -> Result<(), DashError> {
    let config = config::resolve(args)?;
    init_logging(&config, args)?;
    info!("Starting dashview with {:?}", config);

    let source = make_source(&config)?;

    if args.dump {
        let text = dump::run_dump(config.default_view, args, &config, source.as_ref())?;
        println!("{text}");
        return Ok(());
    }

    let mut terminal = ratatui::init();
    let result = run_tui(&mut terminal, &config, source);
    ratatui::restore();
    result
}

fn run_tui(
    terminal: &mut DefaultTerminal,
    config: &DashConfig,
    source: Arc<dyn RecordSource>,
) -> Result<(), DashError> {
    let size = terminal.size()?;
    let mut model = Model::init(config, source, size.width as usize);
    let mut ui = TableUI::new();
    let controller = Controller::new(config);

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(&model, f))?;

        // A timeout still runs an update so finished fetches show up.
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    info!("Quitting dashview");
    Ok(())
}
