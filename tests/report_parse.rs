use asset_grader::error::ParseError;
use asset_grader::report::{ChassisType, parse_report, parse_report_file};
use std::path::Path;

fn report_xml(uid: &str, cosmetic: &[&str], functional: &[&str]) -> String {
    let mut fields = format!(r#"<entry name="UID" type="string">{uid}</entry>"#);
    for c in cosmetic {
        fields.push_str(&format!(r#"<entry name="Cosmetic Defect" type="string">{c}</entry>"#));
    }
    for f in functional {
        fields.push_str(&format!(r#"<entry name="Functional Defect" type="string">{f}</entry>"#));
    }
    format!(
        r#"<root><report><blancco_data>
<description><document_id>doc-1</document_id></description>
<blancco_hardware_report><entries name="system">
<entry name="manufacturer" type="string">LENOVO</entry>
<entry name="version" type="string">ThinkPad T480</entry>
<entry name="chassis_type" type="string">Notebook</entry>
</entries></blancco_hardware_report>
<user_data><entries name="fields">{fields}</entries></user_data>
</blancco_data></report></root>"#
    )
}

#[test]
fn fixture_report_parses() {
    let record = parse_report_file(Path::new("tests/fixtures/report_ab12cd.xml")).unwrap();
    assert_eq!(record.uid, "AB12CD");
    assert_eq!(record.uuid, "5f0c2b7e-1d2a-4c41-9c7e-0a1f2b3c4d5e");
    assert_eq!(record.manufacturer, "DELL");
    assert_eq!(record.model, "OptiPlex 7070");
    assert_eq!(record.chassis_type, ChassisType::Desktop);
    assert_eq!(record.cosmetic_defects, vec![String::new()]);
    assert_eq!(record.functional_defects, vec![String::new()]);
    record.validate().unwrap();
}

#[test]
fn repeated_defect_entries_are_collected() {
    let xml = report_xml(" x9y8 ", &["Scratched lid", "Dented chassis"], &["Dead pixels"]);
    let record = parse_report(&xml).unwrap();
    assert_eq!(record.uid, "X9Y8");
    assert_eq!(record.cosmetic_defects, vec!["Scratched lid", "Dented chassis"]);
    assert_eq!(record.functional_defects, vec!["Dead pixels"]);
    assert_eq!(record.chassis_type, ChassisType::Notebook);
}

#[test]
fn missing_uid_is_fatal_for_the_report_only() {
    let xml = report_xml("", &[], &[]);
    let record = parse_report(&xml).unwrap();
    assert_eq!(record.model, "ThinkPad T480");
    assert_eq!(record.validate(), Err(ParseError::MissingField("UID")));
}

#[test]
fn missing_system_fields_give_partial_record() {
    let xml = r#"<root><entries name="fields"><entry name="UID">q1</entry></entries></root>"#;
    let record = parse_report(xml).unwrap();
    assert_eq!(record.uid, "Q1");
    assert!(record.model.is_empty());
    assert_eq!(record.chassis_type, ChassisType::Other(String::new()));
    assert_eq!(record.validate(), Err(ParseError::MissingField("model")));
}

#[test]
fn malformed_xml_is_a_parse_error() {
    let err = parse_report("<root><entries name=\"fields\">").unwrap_err();
    assert!(matches!(err, ParseError::Malformed(_)));
}
