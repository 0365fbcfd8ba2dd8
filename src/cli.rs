use clap::{ArgAction, Parser};

use crate::views::ViewKind;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "dashview",
    version,
    about = "A tui dashboard for users and products of a demo API.",
    long_about = "dashview fetches users and products from a demo API (or a local file) and lets you search, filter, and page through them.\n\nExamples:\n  dashview\n  dashview products --page-size 20\n  dashview users --dump --filter gender=female --search an\n  dashview --file ./data  (loads ./data/users.json, ./data/products.csv, ...)"
)]
pub struct CliArgs {
    #[arg(value_enum, help = "View to start with.")]
    pub view: Option<ViewKind>,

    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.config/dashview/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "base-url",
        value_name = "URL",
        help_heading = "Input",
        help = "Base url of the demo API."
    )]
    pub base_url: Option<String>,

    #[arg(
        short = 'f',
        long = "file",
        value_name = "PATH",
        help_heading = "Input",
        help = "Load records from a file, or from <collection>.<ext> files in a directory."
    )]
    pub file: Option<String>,

    #[arg(
        long = "limit",
        value_name = "N",
        help_heading = "Input",
        help = "Number of records to fetch per collection."
    )]
    pub limit: Option<usize>,

    #[arg(
        long = "page-size",
        value_name = "N",
        help_heading = "Display",
        help = "Rows per page, one of 5, 10, 20, 50."
    )]
    pub page_size: Option<usize>,

    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        long = "log-file",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write logs to this file."
    )]
    pub log_file: Option<String>,

    #[arg(
        long = "dump",
        help_heading = "Output",
        help = "Print one page as text instead of starting the dashboard."
    )]
    pub dump: bool,

    #[arg(
        short = 's',
        long = "search",
        value_name = "TERM",
        help_heading = "Dump",
        help = "Search term applied to all columns."
    )]
    pub search: Option<String>,

    #[arg(
        long = "filter",
        value_name = "KEY=VALUE",
        value_parser = parse_filter,
        action = ArgAction::Append,
        help_heading = "Dump",
        help = "Filter value (repeatable, one per key)."
    )]
    pub filter: Vec<(String, String)>,

    #[arg(
        long = "tab",
        value_name = "TAB",
        help_heading = "Dump",
        help = "Tab to select, e.g. ALL or laptops."
    )]
    pub tab: Option<String>,

    #[arg(
        long = "page",
        value_name = "N",
        default_value_t = 1,
        help_heading = "Dump",
        help = "Page to print (1-based)."
    )]
    pub page: usize,
}

pub fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_are_split_on_the_first_equal_sign() {
        assert_eq!(
            parse_filter("name=a=b"),
            Ok(("name".to_string(), "a=b".to_string()))
        );
        assert!(parse_filter("name").is_err());
        assert!(parse_filter("=x").is_err());
    }

    #[test]
    fn dump_arguments_parse() {
        let args = CliArgs::parse_from([
            "dashview",
            "products",
            "--dump",
            "--filter",
            "brand=Apple",
            "--filter",
            "title=mac",
            "--tab",
            "laptops",
            "--page-size",
            "10",
        ]);
        assert_eq!(args.view, Some(ViewKind::Products));
        assert!(args.dump);
        assert_eq!(args.filter.len(), 2);
        assert_eq!(args.page, 1);
        assert_eq!(args.page_size, Some(10));
    }
}
