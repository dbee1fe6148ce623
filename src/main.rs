use std::path::PathBuf;
use std::process::ExitCode;

mod board;
mod controller;
mod domain;
mod model;
mod prompt;
mod table;
mod ui;

use clap::Parser;
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use controller::Controller;
use domain::{TBConfig, TBError};
use model::{Model, Status};
use ui::UI;

#[derive(Parser, Debug)]
#[command(name = "tb", version, about = "A tui based viewer for sortable tables and kanban boards")]
struct Cli {
    /// Data file to view (csv, parquet or arrow/ipc)
    path: String,

    /// Rows shown per table page
    #[arg(long, default_value_t = 5)]
    rows_per_page: usize,

    /// Field treated as the unique row identifier
    #[arg(long, default_value = "name")]
    id_field: String,

    /// Comma separated fields eligible for substring search
    #[arg(long, value_delimiter = ',')]
    search_fields: Vec<String>,

    /// Group board lanes by the distinct values of this field
    #[arg(long)]
    board_by: Option<String>,

    /// Append logs to this file (the terminal belongs to the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
        Ok(()) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn run(cli: Cli) -> Result<(), TBError> {
    if let Some(log_file) = &cli.log_file {
        let file = std::sync::Arc::new(std::fs::File::create(log_file)?);
        tracing_subscriber::registry()
            .with(EnvFilter::try_from_env("TB_LOG").unwrap_or_else(|_| EnvFilter::new("info")))
            .with(fmt::layer().with_writer(file).with_ansi(false))
            .with(ErrorLayer::default())
            .init();
    }

    let path = shellexpand::full(&cli.path)
        .map_err(|e| TBError::LoadingFailed(e.to_string()))?
        .to_string();

    let cfg = TBConfig::default()
        .rows_per_page(cli.rows_per_page)
        .id_field(cli.id_field)
        .search_fields(cli.search_fields)
        .board_by(cli.board_by);

    let mut model = Model::init(&cfg);
    model.load_data_file(path.into())?;

    let ui = UI::new();
    let controller = Controller::new(&cfg);
    let mut terminal = ratatui::init();

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(&model, f))?;

        if let Some(message) = controller.handle_event(&model)? {
            model.update(message)?;
        }
    }

    Ok(())
}
