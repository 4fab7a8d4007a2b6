use catalog_core::{CategorySource, ExtractedRecord, PageCursor};
use url::Url;

#[test]
fn page_url_replaces_existing_offset_and_keeps_other_pairs() {
    let base = Url::parse("https://shop.example.com/c?sort=price&offset=99").unwrap();
    let cursor = PageCursor::new("c", 48);
    assert_eq!(
        cursor.page_url(&base).as_str(),
        "https://shop.example.com/c?sort=price&offset=48"
    );
}

#[test]
fn category_id_is_derived_from_url_path() {
    let url = Url::parse("https://shop.example.com/supermarket/fresh/cat20002/c").unwrap();
    let source = CategorySource::from_url(url);
    assert_eq!(source.id, "supermarket_fresh_cat20002_c");

    let bare = CategorySource::from_url(Url::parse("https://shop.example.com/").unwrap());
    assert_eq!(bare.id, "shop.example.com");
}

#[test]
fn record_lookup_and_blank_detection() {
    let record = ExtractedRecord::new(
        "c",
        vec![
            ("name".to_string(), "Milk".to_string()),
            ("price".to_string(), String::new()),
        ],
    );
    assert_eq!(record.get("name"), Some("Milk"));
    assert_eq!(record.get("price"), Some(""));
    assert_eq!(record.get("missing"), None);
    assert!(!record.is_blank());

    let blank = ExtractedRecord::new("c", vec![("name".to_string(), String::new())]);
    assert!(blank.is_blank());
}
