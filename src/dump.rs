//! One-shot rendering of a single page as plain text, used by `--dump`.

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::DashConfig;
use crate::domain::DashError;
use crate::engine::{self, Column, FilterField, FilteredView, Query, TabSelection};
use crate::filters::ActiveFilters;
use crate::model::Model;
use crate::record::Record;
use crate::source::{PageParams, RecordSource};
use crate::views::ViewKind;

/// Resolve a `--tab` argument against the tabs of `kind`. Labels and
/// partition values are both accepted, case does not matter.
pub fn resolve_tab(kind: ViewKind, tab: Option<&str>) -> Result<TabSelection, DashError> {
    let Some(tab) = tab else {
        return Ok(TabSelection::All);
    };
    kind.tabs()
        .into_iter()
        .find(|t| {
            t.label.eq_ignore_ascii_case(tab)
                || matches!(&t.selection, TabSelection::Value(v) if v.eq_ignore_ascii_case(tab))
        })
        .map(|t| t.selection)
        .ok_or_else(|| DashError::ConfigError(format!("{kind} has no tab '{tab}'")))
}

/// Build the engine query for a dump from the command line.
pub fn build_query(
    kind: ViewKind,
    args: &CliArgs,
    config: &DashConfig,
    filter_fields: &[FilterField],
) -> Result<Query, DashError> {
    for (key, _) in &args.filter {
        if !filter_fields.iter().any(|f| &f.key == key) {
            let known: Vec<&str> = filter_fields.iter().map(|f| f.key.as_str()).collect();
            return Err(DashError::ConfigError(format!(
                "unknown filter '{key}' for {kind}, expected one of {}",
                known.join(", ")
            )));
        }
    }
    let active: ActiveFilters = args.filter.iter().cloned().collect();
    let selection = resolve_tab(kind, args.tab.as_deref())?;

    let query = Query::default()
        .with_search_term(args.search.clone().unwrap_or_default())
        .with_active_filters(active)
        .with_page_size(config.page_size.rows())
        .with_current_page(args.page);
    Ok(match kind.tab_partition(&selection) {
        Some(tab) => query.with_tab(tab),
        None => query,
    })
}

/// Render the page of `view` as an aligned text table with a summary line.
pub fn render_page(
    kind: ViewKind,
    columns: &[Column],
    records: &[Record],
    view: &FilteredView,
    page: usize,
    max_column_width: usize,
) -> String {
    let rows = view.paged_records(records);
    let cells: Vec<Vec<String>> = columns
        .iter()
        .map(|c| rows.iter().map(|r| r.display(&c.field)).collect())
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .zip(&cells)
        .map(|(column, data)| {
            let widest = data.iter().map(|s| s.chars().count()).max().unwrap_or(0);
            std::cmp::min(
                std::cmp::max(column.label.chars().count(), widest),
                max_column_width,
            )
        })
        .collect();

    let line = |values: Vec<String>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(value, &width)| format!("{:<width$}", Model::get_visible_name(value, width)))
            .collect::<Vec<String>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![format!(
        "{} · page {} of {} · {} of {} records",
        kind.title(),
        std::cmp::max(page, 1),
        view.total_pages,
        view.filtered.len(),
        records.len()
    )];
    out.push(line(columns.iter().map(|c| c.label.clone()).collect()));
    out.push(line(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for row in 0..rows.len() {
        out.push(line(cells.iter().map(|data| data[row].clone()).collect()));
    }
    if rows.is_empty() {
        out.push("(no records)".to_string());
    }
    out.join("\n")
}

/// Fetch the collection of `kind` once and render the requested page.
pub fn run_dump(
    kind: ViewKind,
    args: &CliArgs,
    config: &DashConfig,
    source: &dyn RecordSource,
) -> Result<String, DashError> {
    info!("Dumping {} from {}", kind.collection(), source.describe());
    let page = PageParams {
        limit: config.fetch_limit,
        skip: 0,
    };
    let fetched = source.fetch(kind.collection(), Some(page))?;
    let columns = kind.columns();
    let filter_fields = kind.filter_fields(&fetched.records);
    let query = build_query(kind, args, config, &filter_fields)?;
    debug!("Dump query: {:?}", query);

    let view = engine::compute(&fetched.records, &columns, &filter_fields, &query);
    Ok(render_page(
        kind,
        &columns,
        &fetched.records,
        &view,
        query.current_page,
        config.max_column_width,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSize;

    fn products() -> Vec<Record> {
        vec![
            Record::new().with("id", 1_i64).with("title", "Essence Mascara").with("brand", "Essence").with("category", "beauty").with("price", 9.99),
            Record::new().with("id", 2_i64).with("title", "MacBook Pro").with("brand", "Apple").with("category", "laptops").with("price", 1999.0),
            Record::new().with("id", 3_i64).with("title", "ThinkPad").with("brand", "Lenovo").with("category", "laptops").with("price", 1299.0),
        ]
    }

    #[test]
    fn tabs_resolve_by_label_or_value() {
        assert_eq!(
            resolve_tab(ViewKind::Products, Some("LAPTOPS")).unwrap(),
            TabSelection::Value("laptops".into())
        );
        assert_eq!(resolve_tab(ViewKind::Products, Some("all")).unwrap(), TabSelection::All);
        assert!(resolve_tab(ViewKind::Users, Some("laptops")).is_err());
    }

    #[test]
    fn unknown_filter_keys_are_rejected() {
        let args = CliArgs {
            filter: vec![("colour".into(), "red".into())],
            page: 1,
            ..Default::default()
        };
        let fields = ViewKind::Products.filter_fields(&products());
        let result = build_query(ViewKind::Products, &args, &DashConfig::default(), &fields);
        assert!(matches!(result, Err(DashError::ConfigError(_))));
    }

    #[test]
    fn renders_the_requested_page() {
        let records = products();
        let args = CliArgs {
            tab: Some("laptops".into()),
            page: 2,
            ..Default::default()
        };
        let config = DashConfig::default().with_page_size(PageSize::Five);
        let kind = ViewKind::Products;
        let fields = kind.filter_fields(&records);
        let mut query = build_query(kind, &args, &config, &fields).unwrap();
        query.page_size = 1;
        let columns = kind.columns();
        let view = engine::compute(&records, &columns, &fields, &query);

        let text = render_page(kind, &columns, &records, &view, query.current_page, 30);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Products · page 2 of 2 · 2 of 3 records");
        assert!(lines[1].starts_with("ID  Title"));
        assert!(lines[3].contains("ThinkPad"));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn empty_pages_say_so() {
        let records = products();
        let kind = ViewKind::Products;
        let columns = kind.columns();
        let view = engine::compute(&records, &columns, &[], &Query::default().with_search_term("zzz"));
        let text = render_page(kind, &columns, &records, &view, 1, 30);
        assert!(text.ends_with("(no records)"));
    }
}
