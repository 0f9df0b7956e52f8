//! Common test utilities for integration tests

use std::fs;
use std::io::Write;
use std::path::Path;

/// Helper function to create a test XML file, creating parent directories
#[allow(dead_code)]
pub fn create_test_xml_file(path: &Path, content: &str) {
    let parent = path.parent().unwrap();
    fs::create_dir_all(parent).unwrap();
    fs::File::create(path)
        .unwrap()
        .write_all(content.as_bytes())
        .unwrap();
}

/// Builds a document with `count` `<record>` elements numbered from 1
#[allow(dead_code)]
pub fn numbered_records(count: usize) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<records>\n");
    for i in 1..=count {
        xml.push_str(&format!(
            "  <record id=\"{i}\"><name>Item {i}</name><value>{}</value></record>\n",
            i * 10
        ));
    }
    xml.push_str("</records>\n");
    xml
}

/// Sample product catalog used across tests
#[allow(dead_code)]
pub const SAMPLE_CATALOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<catalog version="3">
  <product sku="A-1">
    <name>Laptop</name>
    <price>999.99</price>
    <in_stock>true</in_stock>
    <tag>electronics</tag>
    <tag>computers</tag>
  </product>
  <product sku="B-2">
    <name>Mouse &amp; Pad</name>
    <price>19.50</price>
    <in_stock>0</in_stock>
    <tag>accessories</tag>
  </product>
  <product sku="C-3">
    <name><![CDATA[Desk <oak>]]></name>
    <price>n/a</price>
    <in_stock></in_stock>
  </product>
</catalog>
"#;

/// Schema matching [`SAMPLE_CATALOG`]
#[allow(dead_code)]
pub const SAMPLE_CATALOG_XSD: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="catalog">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="product" maxOccurs="unbounded">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="name" type="xs:string"/>
              <xs:element name="price" type="xs:string"/>
              <xs:element name="in_stock" type="xs:string"/>
              <xs:element name="tag" type="xs:string" minOccurs="0" maxOccurs="unbounded"/>
            </xs:sequence>
            <xs:attribute name="sku" type="xs:string"/>
          </xs:complexType>
        </xs:element>
      </xs:sequence>
      <xs:attribute name="version" type="xs:string"/>
    </xs:complexType>
  </xs:element>
</xs:schema>
"#;
