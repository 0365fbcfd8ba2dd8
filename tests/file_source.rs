use std::path::PathBuf;

use dashview::cli::CliArgs;
use dashview::config::{DashConfig, PageSize};
use dashview::domain::DashError;
use dashview::dump;
use dashview::record::Value;
use dashview::source::{FileSource, PageParams, RecordSource};
use dashview::views::ViewKind;

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

#[test]
fn json_collections_keep_the_reported_total() {
    let source = FileSource::new(fixtures());
    let users = source.fetch("users", None).unwrap();
    assert_eq!(users.records.len(), 6);
    assert_eq!(users.total, 208);
    assert_eq!(users.records[0].text("address.city").as_deref(), Some("Phoenix"));
}

#[test]
fn page_params_cut_a_window() {
    let source = FileSource::new(fixtures());
    let page = PageParams { limit: 2, skip: 3 };
    let products = source.fetch("products", Some(page)).unwrap();
    let ids: Vec<String> = products.records.iter().map(|r| r.display("id")).collect();
    assert_eq!(ids, vec!["4", "5"]);
}

#[test]
fn csv_columns_keep_their_types() {
    let source = FileSource::new(fixtures().join("products.csv"));
    let products = source.fetch("products", None).unwrap();
    assert_eq!(products.records.len(), 3);
    assert_eq!(products.records[1].get("id"), Some(&Value::Int(4)));
    assert_eq!(products.records[1].get("price"), Some(&Value::Float(1999.99)));
    assert_eq!(
        products.records[2].text("brand").as_deref(),
        Some("Lenovo")
    );
}

#[test]
fn missing_collections_are_reported() {
    let source = FileSource::new(fixtures());
    assert!(matches!(
        source.fetch("carts", None),
        Err(DashError::FileNotFound(_))
    ));
}

#[test]
fn dump_prints_a_filtered_page() {
    let source = FileSource::new(fixtures());
    let args = CliArgs {
        tab: Some("laptops".into()),
        filter: vec![("brand".into(), "apple".into())],
        page: 1,
        ..Default::default()
    };
    let config = DashConfig::default().with_page_size(PageSize::Ten);
    let text = dump::run_dump(ViewKind::Products, &args, &config, &source).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Products · page 1 of 1 · 1 of 8 records");
    assert!(lines[3].contains("Apple MacBook Pro"));
    assert_eq!(lines.len(), 4);
}
