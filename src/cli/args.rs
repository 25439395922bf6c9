use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "artgrid",
    version,
    about = "paginated, multi-select artwork grid for the Art Institute of Chicago API",
    long_about = "artgrid browses the Art Institute of Chicago artwork collection one page at a time and selects the first N artworks across pages.\n\nExamples:\n  artgrid\n  artgrid -p 3 -r 25 --sort title --order desc\n  artgrid -s 250 -o selection.json\n  artgrid -i\n\nTip: Use --config to persist settings and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv, -vvv)."
    )]
    pub verbose: u8,

    #[arg(
        short = 'n',
        long = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'A',
        long = "output-format",
        visible_alias = "of",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format for the selection (text or json)."
    )]
    pub output_format: Option<String>,

    #[arg(
        short = 'o',
        long = "output",
        visible_alias = "out",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the selected artworks to a file."
    )]
    pub output: Option<String>,

    #[arg(
        short = 'u',
        long = "base-url",
        visible_alias = "url",
        value_name = "URL",
        help_heading = "API",
        help = "Base URL of the artworks API."
    )]
    pub base_url: Option<String>,

    #[arg(
        short = 'C',
        long = "config",
        visible_alias = "cfg",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.artgrid/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "init-config",
        help_heading = "Input",
        help = "Write a default config file if none exists, then exit."
    )]
    pub init_config: bool,

    #[arg(
        short = 'p',
        long = "page",
        value_name = "N",
        help_heading = "Grid",
        help = "Page to show (1-based)."
    )]
    pub page: Option<u64>,

    #[arg(
        short = 'r',
        long = "rows",
        visible_alias = "page-size",
        value_name = "N",
        help_heading = "Grid",
        help = "Rows per page (12, 25, 50 or 100)."
    )]
    pub rows: Option<u64>,

    #[arg(
        long = "sort",
        value_name = "FIELD",
        help_heading = "Grid",
        help = "Sort the visible page by title, artist, origin, start or end."
    )]
    pub sort: Option<String>,

    #[arg(
        long = "order",
        value_name = "ORDER",
        requires = "sort",
        help_heading = "Grid",
        help = "Sort order (asc or desc, default asc)."
    )]
    pub order: Option<String>,

    #[arg(
        short = 's',
        long = "select-first",
        visible_alias = "select",
        value_name = "N",
        allow_hyphen_values = true,
        help_heading = "Selection",
        help = "Select the first N artworks of the collection."
    )]
    pub select_first: Option<String>,

    #[arg(
        long = "bulk-page-size",
        value_name = "N",
        help_heading = "Selection",
        help = "Rows per request when selecting the first N artworks."
    )]
    pub bulk_page_size: Option<u64>,

    #[arg(
        short = 'i',
        long = "interactive",
        help_heading = "Grid",
        help = "Browse interactively (type 'help' at the prompt)."
    )]
    pub interactive: bool,

    #[arg(
        short = 'T',
        long = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        long = "proxy",
        visible_alias = "px",
        value_name = "URL",
        help_heading = "HTTP",
        help = "HTTP proxy URL (e.g. http://127.0.0.1:8080)."
    )]
    pub proxy: Option<String>,

    #[arg(
        short = 'H',
        long = "header",
        value_name = "HEADER",
        help_heading = "HTTP",
        help = "Add a header to all requests (format: 'Key: Value')."
    )]
    pub header: Option<String>,
}
