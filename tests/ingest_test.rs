//! End-to-end tests for the streaming ingestion pipeline

mod common;

use common::{create_test_xml_file, numbered_records, SAMPLE_CATALOG, SAMPLE_CATALOG_XSD};
use polars::prelude::*;
use std::fs::File;
use tempfile::TempDir;
use xml_ingest::config::IngestConfig;
use xml_ingest::errors::{IngestError, IngestResult};
use xml_ingest::ingest::{
    classify, coerce, quick_table, Coerced, Ingestor, RecordExtractor, RecordStream, Table,
    XmlSource,
};
use xml_ingest::models::{Element, FieldValue, Record};

fn ingestor(tag: &str, batch_size: usize) -> Ingestor {
    Ingestor::new(IngestConfig::for_tag(tag).with_batch_size(batch_size)).unwrap()
}

#[test]
fn test_item_fields_and_coercion() {
    let xml = br#"<items><item id="7"><active>TRUE</active><qty></qty></item></items>"#;
    let table = ingestor("item", 10).assemble(XmlSource::bytes(xml)).unwrap();

    assert_eq!(table.len(), 1);
    let record = &table.rows()[0];
    assert_eq!(record.text("id"), Some("7"));
    assert!(coerce(record.text("active"), false));
    assert_eq!(coerce(record.text("qty"), 0i64), 0);
    assert!(record.coerce("active", false));
    assert_eq!(record.classify::<i64>("qty"), Coerced::Missing);
}

#[test]
fn test_duplicate_children_become_list() {
    let xml = br#"<root><record><tag>a</tag><tag>b</tag></record></root>"#;
    let table = quick_table(XmlSource::bytes(xml), "record").unwrap();

    assert_eq!(
        table.rows()[0].get("tag"),
        Some(&FieldValue::List(vec!["a".to_string(), "b".to_string()]))
    );
}

#[test]
fn test_five_records_batch_size_two() {
    let xml = numbered_records(5);
    let ingestor = ingestor("record", 2);
    let sizes: Vec<usize> = ingestor
        .batches(XmlSource::bytes(xml.as_bytes()))
        .unwrap()
        .map(|batch| batch.unwrap().len())
        .collect();

    assert_eq!(sizes, vec![2, 2, 1]);
}

#[test]
fn test_batch_count_is_ceiling() {
    for (records, batch_size) in [(1, 1), (10, 3), (12, 4), (7, 100)] {
        let xml = numbered_records(records);
        let batches = ingestor("record", batch_size)
            .batches(XmlSource::bytes(xml.as_bytes()))
            .unwrap()
            .count();
        assert_eq!(batches, records.div_ceil(batch_size), "{records}/{batch_size}");
    }
}

#[test]
fn test_batching_preserves_sequence() {
    let xml = numbered_records(9);
    let extractor = RecordExtractor::default();

    let mut stream = RecordStream::new(xml.as_bytes(), "record");
    let mut direct = Vec::new();
    while let Some(element) = stream.next_element().unwrap() {
        direct.push(extractor.extract(element));
    }

    for batch_size in 1..=10 {
        let batched: Vec<Record> = ingestor("record", batch_size)
            .batches(XmlSource::bytes(xml.as_bytes()))
            .unwrap()
            .flat_map(|batch| batch.unwrap())
            .collect();
        assert_eq!(batched, direct, "batch size {batch_size}");
    }
}

#[test]
fn test_no_matching_records_gives_empty_table() {
    let xml = numbered_records(3);
    let ingestor = ingestor("missing", 2);

    assert_eq!(
        ingestor.batches(XmlSource::bytes(xml.as_bytes())).unwrap().count(),
        0
    );
    let table = ingestor.assemble(XmlSource::bytes(xml.as_bytes())).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.to_dataframe().unwrap().height(), 0);
}

#[test]
fn test_truncated_document_is_parse_error() {
    let xml = br#"<records><record id="1"><name>x</name></record><record id="2"><name>"#;
    let result = ingestor("record", 10).assemble(XmlSource::bytes(xml));

    match result {
        Err(IngestError::Parse { position, .. }) => assert!(position.is_some()),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_mismatched_tags_surface_through_batches() {
    let xml = br#"<records><record><a>1</b></record></records>"#;
    let ingestor = ingestor("record", 10);
    let mut batches = ingestor.batches(XmlSource::bytes(xml)).unwrap();

    assert!(batches.next().unwrap().unwrap_err().is_parse());
    assert!(batches.next().is_none());
}

#[test]
fn test_row_count_matches_elements() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("records.xml");
    create_test_xml_file(&path, &numbered_records(250));

    let table = ingestor("record", 64).assemble(XmlSource::path(&path)).unwrap();
    assert_eq!(table.len(), 250);
    assert_eq!(table.rows()[249].text("name"), Some("Item 250"));
}

#[test]
fn test_catalog_text_handling() {
    let table = ingestor("product", 2)
        .assemble(XmlSource::bytes(SAMPLE_CATALOG.as_bytes()))
        .unwrap();
    let rows = table.rows();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1].text("name"), Some("Mouse & Pad"));
    assert_eq!(rows[2].text("name"), Some("Desk <oak>"));
    assert_eq!(rows[1].text("tag"), Some("accessories"));
    assert!(!rows[2].contains("tag"));
    assert_eq!(rows[0].coerce("price", 0.0f64), 999.99);
    assert_eq!(rows[2].coerce("price", -1.0f64), -1.0);
    assert!(matches!(
        rows[2].classify::<f64>("price"),
        Coerced::Invalid { .. }
    ));
    assert!(!rows[1].coerce("in_stock", true));
    assert_eq!(classify::<bool>(rows[2].text("in_stock")), Coerced::Missing);
}

#[test]
fn test_custom_transform_and_dataframe_types() {
    let ingestor = ingestor("product", 2);
    let table = ingestor
        .assemble_with(
            XmlSource::bytes(SAMPLE_CATALOG.as_bytes()),
            |el: &Element| -> IngestResult<Record> {
                let mut record = Record::new();
                record.insert("sku", el.attribute("sku").unwrap_or_default());
                record.insert("price", coerce(Some(el.find_text("price", None, "")), 0.0f64));
                record.insert(
                    "in_stock",
                    coerce(Some(el.find_text("in_stock", None, "")), false),
                );
                Ok(record)
            },
        )
        .unwrap();

    let df = table.to_dataframe().unwrap();
    assert_eq!(df.shape(), (3, 3));
    assert_eq!(df.column("sku").unwrap().dtype(), &DataType::String);
    assert_eq!(df.column("price").unwrap().dtype(), &DataType::Float64);
    assert_eq!(df.column("in_stock").unwrap().dtype(), &DataType::Boolean);
}

#[test]
fn test_transform_error_propagates_unchanged() {
    let result = ingestor("product", 2).assemble_with(
        XmlSource::bytes(SAMPLE_CATALOG.as_bytes()),
        |el: &Element| -> IngestResult<Record> {
            match el.attribute("sku") {
                Some("C-3") => Err(IngestError::Transform("discontinued product".into())),
                _ => Ok(Record::new()),
            }
        },
    );

    match result {
        Err(IngestError::Transform(message)) => assert_eq!(message, "discontinued product"),
        other => panic!("expected transform error, got {other:?}"),
    }
}

#[test]
fn test_schema_gate() {
    let temp_dir = TempDir::new().unwrap();
    let xsd = temp_dir.path().join("catalog.xsd");
    create_test_xml_file(&xsd, SAMPLE_CATALOG_XSD);

    let config = IngestConfig::for_tag("product").with_schema(&xsd);
    let ingestor = Ingestor::new(config).unwrap();
    assert!(ingestor
        .validate(XmlSource::bytes(SAMPLE_CATALOG.as_bytes()))
        .unwrap());
    assert_eq!(
        ingestor
            .assemble(XmlSource::bytes(SAMPLE_CATALOG.as_bytes()))
            .unwrap()
            .len(),
        3
    );

    let bad = br#"<catalog><product><name>x</name><colour>red</colour></product></catalog>"#;
    assert!(!ingestor.validate(XmlSource::bytes(bad)).unwrap());
    assert!(matches!(
        ingestor.assemble(XmlSource::bytes(bad)),
        Err(IngestError::Validation(_))
    ));
}

#[test]
fn test_validation_fails_open_without_validator() {
    let config = IngestConfig::for_tag("product").with_schema("/missing/catalog.xsd");
    let ingestor = Ingestor::new(config).unwrap().without_validator();

    let bad = br#"<catalog><product><colour>red</colour></product></catalog>"#;
    assert!(ingestor.validate(XmlSource::bytes(bad)).unwrap());
    assert_eq!(ingestor.assemble(XmlSource::bytes(bad)).unwrap().len(), 1);
}

#[test]
fn test_namespaced_records() {
    let xml = br#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:cac="urn:cac">
  <entry><id>1</id><cac:amount currency="EUR">10.5</cac:amount></entry>
  <entry><id>2</id><cac:amount currency="EUR">3</cac:amount></entry>
</feed>"#;

    let plain = ingestor("entry", 10).assemble(XmlSource::bytes(xml)).unwrap();
    assert!(plain.is_empty());

    let table = ingestor("{http://www.w3.org/2005/Atom}entry", 10)
        .assemble(XmlSource::bytes(xml))
        .unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.columns(), vec!["id", "amount"]);
    assert_eq!(table.rows()[0].text("amount"), Some("10.5"));
}

#[test]
fn test_parquet_output() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("out/catalog.parquet");

    let table = ingestor("product", 2)
        .assemble(XmlSource::bytes(SAMPLE_CATALOG.as_bytes()))
        .unwrap();
    let bytes = xml_ingest::ingest::write_parquet(&table, &output).unwrap();
    assert!(bytes > 0);

    let df = ParquetReader::new(File::open(&output).unwrap())
        .finish()
        .unwrap();
    assert_eq!(df.height(), 3);
    assert!(matches!(df.column("tag").unwrap().dtype(), DataType::List(_)));
}

#[test]
fn test_tables_concatenate_across_files() {
    let first = ingestor("record", 2)
        .assemble(XmlSource::bytes(numbered_records(3).as_bytes()))
        .unwrap();
    let mut combined = Table::new();
    combined.extend(first);
    combined.extend(
        ingestor("record", 2)
            .assemble(XmlSource::bytes(numbered_records(2).as_bytes()))
            .unwrap(),
    );
    assert_eq!(combined.len(), 5);
}

#[test]
fn test_nested_records_each_become_a_row() {
    let xml = br#"<r><item id="outer"><item id="inner"><name>in</name></item><name>out</name></item></r>"#;
    let table = ingestor("item", 10).assemble(XmlSource::bytes(xml)).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.rows()[0].text("id"), Some("inner"));
    assert_eq!(table.rows()[0].text("name"), Some("in"));
    assert_eq!(table.rows()[1].text("id"), Some("outer"));
    assert_eq!(table.rows()[1].text("name"), Some("out"));
}

#[test]
fn test_latin1_file_is_decoded() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("latin1.xml");
    std::fs::write(
        &path,
        b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<r><item><name>Caf\xE9</name></item></r>",
    )
    .unwrap();

    let table = ingestor("item", 10).assemble(XmlSource::path(&path)).unwrap();
    assert_eq!(table.rows()[0].text("name"), Some("Café"));
}

#[test]
fn test_schema_gate_rejects_structural_mismatch() {
    let temp_dir = TempDir::new().unwrap();
    let xsd = temp_dir.path().join("catalog.xsd");
    create_test_xml_file(&xsd, SAMPLE_CATALOG_XSD);
    let ingestor = Ingestor::new(IngestConfig::for_tag("product").with_schema(&xsd)).unwrap();

    // product is missing its required price and in_stock children
    let missing = br#"<catalog><product><name>x</name></product></catalog>"#;
    assert!(!ingestor.validate(XmlSource::bytes(missing)).unwrap());

    // name is declared, but only inside product
    let misplaced = br#"<catalog><name>x</name></catalog>"#;
    assert!(matches!(
        ingestor.assemble(XmlSource::bytes(misplaced)),
        Err(IngestError::Validation(_))
    ));
}
