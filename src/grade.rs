use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Stands in for the defect list when the report recorded none.
pub const NO_DEFECTS: &str = "-";

// Weights are compared after rounding to this many decimals, so binary drift
// in a sum like 0.1 + 0.2 + 0.15 cannot push it across a breakpoint.
const WEIGHT_DECIMALS: i32 = 12;

fn settle(weight: f64) -> f64 {
    let scale = 10f64.powi(WEIGHT_DECIMALS);
    (weight * scale).round() / scale
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefectRule {
    pub defect: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefectBank {
    #[serde(rename = "Cosmetic Defects", default)]
    pub cosmetic: Vec<DefectRule>,
    #[serde(rename = "Functional Defects", default)]
    pub functional: Vec<DefectRule>,
}

impl DefectBank {
    /// Reads the JSON rulebook. A missing file is created empty so the
    /// operator has something to fill in, and the run is refused.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                crate::util::ensure_dir(parent)?;
            }
            std::fs::write(path, "{}\n")
                .with_context(|| format!("creating defect rulebook: {}", path.display()))?;
            bail!(
                "defect rulebook was missing; created an empty one at {}",
                path.display()
            );
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading defect rulebook: {}", path.display()))?;
        let bank: DefectBank = serde_json::from_str(&raw)
            .with_context(|| format!("parsing defect rulebook: {}", path.display()))?;
        if bank.is_empty() {
            bail!(
                "defect rulebook is empty; add defects to {} and try again",
                path.display()
            );
        }
        Ok(bank)
    }

    pub fn is_empty(&self) -> bool {
        self.cosmetic.is_empty() && self.functional.is_empty()
    }

    pub fn grade(&self, defects: &DefectSet) -> GradeResult {
        let cosmetic_weight = axis_weight(&self.cosmetic, defects);
        let functional_weight = axis_weight(&self.functional, defects);
        GradeResult {
            cosmetic_grade: CosmeticGrade::from_weight(cosmetic_weight),
            functional_grade: FunctionalGrade::from_weight(functional_weight),
            observed_defects: defects.labels().to_vec(),
            cosmetic_weight,
            functional_weight,
        }
    }
}

fn axis_weight(rules: &[DefectRule], defects: &DefectSet) -> f64 {
    let total: f64 = rules
        .iter()
        .filter(|r| defects.contains(&r.defect))
        .map(|r| r.weight)
        .sum();
    settle(total)
}

/// Grades a report's defect lists against the bank in one step.
pub fn grade(cosmetic: &[String], functional: &[String], bank: &DefectBank) -> GradeResult {
    bank.grade(&DefectSet::merge(cosmetic, functional))
}

/// Ordered, de-duplicated defect labels for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefectSet {
    labels: Vec<String>,
}

impl DefectSet {
    pub fn merge(cosmetic: &[String], functional: &[String]) -> Self {
        let mut labels: Vec<String> = Vec::new();
        for label in cosmetic.iter().chain(functional) {
            let label = label.trim();
            if label.is_empty() || labels.iter().any(|l| l == label) {
                continue;
            }
            labels.push(label.to_string());
        }
        if labels.is_empty() {
            labels.push(NO_DEFECTS.to_string());
        }
        Self { labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// True when the report recorded no defects at all.
    pub fn is_unrecorded(&self) -> bool {
        self.labels.len() == 1 && self.labels[0] == NO_DEFECTS
    }

    /// Replaces the "no defects" sentinel with a battery defect when the
    /// wear is under the threshold. Records that already carry real defects
    /// are left as they are. Returns whether the set changed.
    pub fn inject_low_battery(&mut self, wear_percent: u32, threshold: u32) -> bool {
        if wear_percent >= threshold || !self.is_unrecorded() {
            return false;
        }
        self.labels = vec![format!("Battery {wear_percent}%")];
        true
    }

    /// Value written to the remote `Defect` attribute.
    pub fn joined(&self) -> String {
        self.labels.join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CosmeticGrade {
    A,
    B,
    C,
}

impl CosmeticGrade {
    pub fn from_weight(w: f64) -> Self {
        let w = settle(w);
        if w <= 0.0 {
            Self::A
        } else if w <= 0.45 {
            Self::B
        } else {
            Self::C
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionalGrade {
    A,
    B,
    C,
    F,
}

impl FunctionalGrade {
    pub fn from_weight(w: f64) -> Self {
        let w = settle(w);
        if w <= 0.0 {
            Self::A
        } else if w <= 0.4 {
            Self::B
        } else if w <= 0.75 {
            Self::C
        } else {
            Self::F
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::F => "F",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    pub cosmetic_grade: CosmeticGrade,
    pub functional_grade: FunctionalGrade,
    pub observed_defects: Vec<String>,
    pub cosmetic_weight: f64,
    pub functional_weight: f64,
}
