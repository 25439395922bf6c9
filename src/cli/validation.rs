use crate::cli::args::CliArgs;
use crate::output::OutputFormat;
use crate::state::{self, SortDirection, SortField};

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(page) = args.page {
        if page == 0 {
            return Err("invalid page, expected positive integer".to_string());
        }
    }
    if let Some(rows) = args.rows {
        state::validate_page_size(rows).map_err(|e| format!("invalid --rows: {e}"))?;
    }
    if let Some(raw) = args.sort.as_deref() {
        SortField::parse(raw).map_err(|e| format!("invalid --sort: {e}"))?;
    }
    if let Some(raw) = args.order.as_deref() {
        SortDirection::parse(raw).map_err(|e| format!("invalid --order: {e}"))?;
    }
    if let Some(raw) = args.output_format.as_deref() {
        if OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --output-format '{raw}', expected text or json"
            ));
        }
    }
    if let Some(size) = args.bulk_page_size {
        if size == 0 {
            return Err("invalid bulk-page-size, expected positive integer".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }
    if args.interactive && args.output.is_some() {
        return Err("--output cannot be combined with --interactive".to_string());
    }
    Ok(())
}
