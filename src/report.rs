use crate::error::ParseError;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

const CUSTOM_FIELDS: &str = "fields";
const SYSTEM_FIELDS: &str = "system";

/// Flat view of one diagnostic report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Remote asset identifier, uppercased.
    pub uid: String,
    /// The report's own document id.
    pub uuid: String,
    pub model: String,
    pub manufacturer: String,
    pub chassis_type: ChassisType,
    pub cosmetic_defects: Vec<String>,
    pub functional_defects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChassisType {
    Laptop,
    Notebook,
    Convertible,
    Desktop,
    Other(String),
}

impl ChassisType {
    pub fn from_report(raw: &str) -> Self {
        match raw.trim() {
            "Laptop" => Self::Laptop,
            "Notebook" => Self::Notebook,
            "Convertible" => Self::Convertible,
            "Desktop" => Self::Desktop,
            other => Self::Other(other.to_string()),
        }
    }
}

impl ReportRecord {
    /// Rejects records that cannot be used as a remote lookup.
    pub fn validate(&self) -> Result<(), ParseError> {
        if self.uid.trim().is_empty() {
            return Err(ParseError::MissingField("UID"));
        }
        if self.model.trim().is_empty() {
            return Err(ParseError::MissingField("model"));
        }
        Ok(())
    }
}

pub fn parse_report_file(path: &Path) -> Result<ReportRecord, ParseError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ParseError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_report(&raw)
}

/// Extracts a record from report XML. Missing fields are logged and left
/// empty; only a document that does not parse at all is an error here.
pub fn parse_report(xml: &str) -> Result<ReportRecord, ParseError> {
    let doc = Document::parse(xml).map_err(|e| ParseError::malformed(e.to_string()))?;
    let root = doc.root_element();

    let uid = field_text(root, CUSTOM_FIELDS, "UID")
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_else(|| {
            warn!("report field missing: UID");
            String::new()
        });

    let cosmetic_defects = field_list(root, CUSTOM_FIELDS, "Cosmetic Defect");
    let functional_defects = field_list(root, CUSTOM_FIELDS, "Functional Defect");

    let uuid = root
        .descendants()
        .find(|n| n.has_tag_name("document_id"))
        .and_then(|n| n.text())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let model = required(root, SYSTEM_FIELDS, "version", &uid);
    let manufacturer = required(root, SYSTEM_FIELDS, "manufacturer", &uid);
    let chassis_type = ChassisType::from_report(&required(root, SYSTEM_FIELDS, "chassis_type", &uid));

    Ok(ReportRecord {
        uid,
        uuid,
        model,
        manufacturer,
        chassis_type,
        cosmetic_defects,
        functional_defects,
    })
}

fn required(root: Node, group: &str, name: &str, uid: &str) -> String {
    match field_text(root, group, name) {
        Some(s) => s.trim().to_string(),
        None => {
            warn!(uid, "report field missing: {group}/{name}");
            String::new()
        }
    }
}

fn field_entries<'a, 'input>(
    root: Node<'a, 'input>,
    group: &str,
    name: &str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    root.descendants()
        .filter(move |n| n.has_tag_name("entries") && n.attribute("name") == Some(group))
        .flat_map(|entries| entries.children())
        .filter(move |n| n.has_tag_name("entry") && n.attribute("name") == Some(name))
}

fn field_text<'a>(root: Node<'a, '_>, group: &str, name: &str) -> Option<&'a str> {
    field_entries(root, group, name).next().and_then(|n| n.text())
}

fn field_list(root: Node, group: &str, name: &str) -> Vec<String> {
    field_entries(root, group, name)
        .map(|n| clean_defect(n.text().unwrap_or_default()))
        .collect()
}

/// "No defects found" entries carry no information; they become empty.
fn clean_defect(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower == "no defects found" || lower == "no defects" {
        String::new()
    } else {
        trimmed.to_string()
    }
}
