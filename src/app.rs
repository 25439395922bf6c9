use std::future::Future;
use std::io::Write;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::api::{ClientOptions, HttpSource, DEFAULT_BASE_URL};
use crate::cli::args::CliArgs;
use crate::cli::validation;
use crate::config::{self, ConfigFile};
use crate::grid::{Grid, GridOptions, BULK_PAGE_SIZE, MAX_BULK_PAGES};
use crate::output::{self, OutputFormat};
use crate::state::{self, PageState, SortDirection, SortField, DEFAULT_PAGE_SIZE};

const HELP: &str = "commands:
  next | n              show the next page
  prev | p              show the previous page
  page N                jump to page N
  rows N                rows per page (12, 25, 50, 100)
  sort FIELD [asc|desc] sort the visible page (title, artist, origin, start, end)
  unsort                drop the sort
  select N              select the first N artworks of the collection
  toggle ID             select or unselect a visible artwork
  all                   select every visible artwork, or unselect them if all are selected
  clear                 clear the selection
  show                  redraw the current page
  selected              list the selected artworks
  help                  show this help
  quit | q              exit";

#[derive(Clone, Debug)]
struct RunConfig {
    client: ClientOptions,
    initial_state: PageState,
    bulk_page_size: u64,
    max_bulk_pages: u64,
    select_first: Option<String>,
    interactive: bool,
    output: Option<String>,
    output_format: OutputFormat,
    no_color: bool,
    verbose: u8,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);

    let base_url = args
        .base_url
        .or(cfg.base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let timeout_seconds = args.timeout.or(cfg.timeout).unwrap_or(10);
    let proxy = args.proxy.or(cfg.proxy);
    let header = args.header.or(cfg.header);

    let rows = args.rows.or(cfg.page_size).unwrap_or(DEFAULT_PAGE_SIZE);
    let page = args.page.unwrap_or(1);
    let mut initial_state = PageState::for_page(page, rows).map_err(|e| e.to_string())?;
    if let Some(raw) = args.sort.as_deref() {
        let field = SortField::parse(raw).map_err(|e| e.to_string())?;
        let direction = match args.order.as_deref() {
            Some(order) => SortDirection::parse(order).map_err(|e| e.to_string())?,
            None => SortDirection::Ascending,
        };
        initial_state = initial_state.with_sort(field, direction);
    }

    let bulk_page_size = args
        .bulk_page_size
        .or(cfg.bulk_page_size)
        .unwrap_or(BULK_PAGE_SIZE);
    if bulk_page_size == 0 {
        return Err("invalid bulk_page_size, expected positive integer".to_string());
    }
    let max_bulk_pages = cfg.max_bulk_pages.unwrap_or(MAX_BULK_PAGES);
    if max_bulk_pages == 0 {
        return Err("invalid max_bulk_pages, expected positive integer".to_string());
    }

    let output = args.output.map(|p| config::expand_tilde_string(&p));
    let output_format = match args.output_format.or(cfg.output_format) {
        Some(raw) => OutputFormat::parse(&raw)
            .ok_or_else(|| format!("invalid output format '{raw}', expected text or json"))?,
        None => output
            .as_deref()
            .and_then(output::infer_format_from_path)
            .unwrap_or(OutputFormat::Text),
    };

    Ok(RunConfig {
        client: ClientOptions {
            base_url,
            timeout_seconds,
            proxy,
            header,
            use_system_proxy: true,
        },
        initial_state,
        bulk_page_size,
        max_bulk_pages,
        select_first: args.select_first,
        interactive: args.interactive,
        output,
        output_format,
        no_color,
        verbose: args.verbose,
    })
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,artgrid={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

async fn with_spinner<F: Future>(message: &str, fut: F) -> F::Output {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(120));
    if let Ok(style) = ProgressStyle::with_template(":: {spinner} {msg} [{elapsed_precise}]") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    let out = fut.await;
    pb.finish_and_clear();
    out
}

async fn show_page(grid: &Grid<HttpSource>) {
    print!("{}", output::render_page_table(&grid.snapshot().await));
}

async fn change_page(grid: &Grid<HttpSource>, state: PageState) {
    with_spinner("loading artworks", grid.on_page_state_change(state)).await;
    show_page(grid).await;
}

async fn submit_selection(grid: &Grid<HttpSource>, input: &str) {
    grid.set_select_input(input).await;
    with_spinner("selecting artworks", grid.submit_select_input()).await;
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Command {
    Next,
    Prev,
    Page(u64),
    Rows(u64),
    Sort(SortField, SortDirection),
    Unsort,
    Select(String),
    Toggle(u64),
    All,
    Clear,
    Show,
    Selected,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut parts = line.split_whitespace();
    let name = match parts.next() {
        Some(name) => name.to_lowercase(),
        None => return Ok(None),
    };
    let arg = parts.next();
    let number = |what: &str| -> Result<u64, String> {
        arg.ok_or_else(|| format!("{what} expects a number"))?
            .parse::<u64>()
            .map_err(|_| format!("{what} expects a number"))
    };
    let cmd = match name.as_str() {
        "next" | "n" => Command::Next,
        "prev" | "p" => Command::Prev,
        "page" => {
            let page = number("page")?;
            if page == 0 {
                return Err("pages start at 1".to_string());
            }
            Command::Page(page)
        }
        "rows" => {
            let rows = state::validate_page_size(number("rows")?).map_err(|e| e.to_string())?;
            Command::Rows(rows)
        }
        "sort" => {
            let field = SortField::parse(arg.ok_or("sort expects a field")?)
                .map_err(|e| e.to_string())?;
            let direction = match parts.next() {
                Some(raw) => SortDirection::parse(raw).map_err(|e| e.to_string())?,
                None => SortDirection::Ascending,
            };
            Command::Sort(field, direction)
        }
        "unsort" => Command::Unsort,
        "select" => Command::Select(arg.unwrap_or_default().to_string()),
        "toggle" => Command::Toggle(number("toggle")?),
        "all" => Command::All,
        "clear" => Command::Clear,
        "show" => Command::Show,
        "selected" => Command::Selected,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{other}', type 'help'")),
    };
    Ok(Some(cmd))
}

async fn run_interactive(grid: &Grid<HttpSource>) -> Result<(), String> {
    println!("{}", "type 'help' for commands".dimmed());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "artgrid>".bold().blue());
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => return Err(format!("failed to read input: {e}")),
        };
        let cmd = match parse_command(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e.red());
                continue;
            }
        };

        let current = grid.page_state().await;
        match cmd {
            Command::Next => match current.next_page() {
                Ok(state) => change_page(grid, state).await,
                Err(e) => println!("{}", e.to_string().red()),
            },
            Command::Prev => change_page(grid, current.previous_page()).await,
            Command::Page(page) => match PageState::for_page(page, current.page_size()) {
                Ok(state) => {
                    let state = match current.sort_field() {
                        Some(field) => state.with_sort(field, current.sort_direction()),
                        None => state,
                    };
                    change_page(grid, state).await;
                }
                Err(e) => println!("{}", e.to_string().red()),
            },
            Command::Rows(rows) => match current.with_page_size(rows) {
                Ok(state) => change_page(grid, state).await,
                Err(e) => println!("{}", e.to_string().red()),
            },
            Command::Sort(field, direction) => {
                change_page(grid, current.with_sort(field, direction)).await
            }
            Command::Unsort => change_page(grid, current.without_sort()).await,
            Command::Select(input) => {
                submit_selection(grid, &input).await;
                show_page(grid).await;
            }
            Command::Toggle(id) => match grid.toggle_visible(id).await {
                Some(_) => show_page(grid).await,
                None => println!("{}", format!("artwork {id} is not on this page").red()),
            },
            Command::All => {
                grid.toggle_page().await;
                show_page(grid).await;
            }
            Command::Clear => {
                grid.clear_selection().await;
                show_page(grid).await;
            }
            Command::Show => show_page(grid).await,
            Command::Selected => {
                let snapshot = grid.snapshot().await;
                print!(
                    "{}",
                    String::from_utf8_lossy(&output::render_text(snapshot.selection.records()))
                );
                println!(":: {}", snapshot.footer().bold().green());
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
        }
    }
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    if run.no_color {
        colored::control::set_override(false);
    }

    let source = HttpSource::new(&run.client).map_err(|e| e.to_string())?;
    let grid = Grid::new(
        source,
        GridOptions {
            initial_state: run.initial_state,
            bulk_page_size: run.bulk_page_size,
            max_bulk_pages: run.max_bulk_pages,
        },
    );

    println!(
        ":: {:<10}: {}",
        "API",
        run.client.base_url.as_str().bold().blue()
    );
    with_spinner("loading artworks", grid.on_page_state_change(run.initial_state)).await;

    if let Some(input) = run.select_first.as_deref() {
        submit_selection(&grid, input).await;
    }

    show_page(&grid).await;

    if run.interactive {
        run_interactive(&grid).await?;
    }

    if let Some(path) = run.output.as_deref() {
        let snapshot = grid.snapshot().await;
        let bytes = output::render(run.output_format, snapshot.selection.records());
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| format!("failed to write output file {path}: {e}"))?;
        println!(
            ":: wrote {} artworks to {}",
            snapshot.selection.len(),
            path.bold()
        );
    }

    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp => {
                print!("{}", CliArgs::command().render_long_help());
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    init_logging(args.verbose);

    let user_config_path = args.config.clone().map(|p| config::expand_tilde(&p));
    if args.init_config {
        let path = user_config_path
            .or_else(config::default_config_path)
            .ok_or_else(|| "could not determine config path".to_string())?;
        if config::ensure_default_config_file(&path)? {
            println!(":: wrote default config to {}", path.display());
        } else {
            println!(":: config already exists at {}", path.display());
        }
        return Ok(());
    }

    let cfg = match user_config_path.as_ref() {
        Some(path) => config::load_config(path, false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;
    tracing::debug!(verbose = run.verbose, state = ?run.initial_state, "starting");

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))?;
    Ok(())
}
