//! Cleanup of the freeform hardware strings the diagnostic tool writes into
//! the remote record.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static RAW_VENDOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\((?:r|tm)\)|[®™]|(?:^|,)\s*(?:\d+(?:st|nd|rd|th)\s+gen\s+)?(?:intel|amd)\b")
        .expect("static regex")
});

static TRADEMARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\((?:r|tm|c)\)|[®™©]").expect("static regex"));

static CLOCK_SPEED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*@\s*[\d.]*\s*(?:[gm]hz)?").expect("static regex"));

static GRAPHICS_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:with|w/)\s+radeon.*$").expect("static regex"));

static GENERATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\d+(?:st|nd|rd|th)\s+gen\b").expect("static regex"));

static CORE_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:\d+|dual|quad|six|eight|twelve|sixteen)-core\b").expect("static regex")
});

static MARKETING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:intel|amd|genuine|core|cpu|processor)\b").expect("static regex")
});

static BATTERY_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d{1,3})(?:\D|$)").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CpuNormalized {
    pub value: String,
    pub changed: bool,
}

/// A CPU string straight from the diagnostic tool still carries its clock
/// speed or vendor markers; cleaned values carry neither.
///
/// Deliberately broader than checking for the `@` clock marker alone: AMD
/// strings such as `"AMD Ryzen 7 3700X 8-Core Processor"` have no clock speed
/// but still need cleaning, so `(R)`/`(TM)`/`®`/`™` and a leading `Intel` or
/// `AMD` also count as raw.
pub fn cpu_needs_normalization(raw: &str) -> bool {
    raw.contains('@') || RAW_VENDOR.is_match(raw)
}

/// `"Intel(R) Core(TM) i5-8250U CPU @ 1.60GHz"` becomes `"i5-8250U"`;
/// repeated sockets collapse to `"i5-8250U (x2)"`.
pub fn normalize_cpu(raw: &str) -> CpuNormalized {
    if !cpu_needs_normalization(raw) {
        return CpuNormalized {
            value: raw.to_string(),
            changed: false,
        };
    }

    let mut counts: Vec<(String, usize)> = Vec::new();
    for entry in raw.split(',') {
        let cleaned = strip_cpu_entry(entry);
        if cleaned.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(name, _)| *name == cleaned) {
            Some((_, n)) => *n += 1,
            None => counts.push((cleaned, 1)),
        }
    }

    let value = counts
        .into_iter()
        .map(|(name, n)| if n > 1 { format!("{name} (x{n})") } else { name })
        .collect::<Vec<_>>()
        .join(", ");

    let changed = value != raw;
    CpuNormalized { value, changed }
}

fn strip_cpu_entry(entry: &str) -> String {
    let s = TRADEMARK.replace_all(entry, " ");
    let s: String = s.nfkc().collect();
    let s = CLOCK_SPEED.replace_all(&s, " ");
    let s = GRAPHICS_SUFFIX.replace_all(&s, "");
    let s = GENERATION.replace_all(&s, " ");
    let s = CORE_COUNT.replace_all(&s, " ");
    let s = MARKETING.replace_all(&s, " ");
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        entry.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        collapsed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatteryWear {
    /// `None` when the raw value held no usable integer.
    pub percent: Option<u32>,
    pub value: String,
    pub changed: bool,
}

impl BatteryWear {
    pub fn is_unparsable(&self) -> bool {
        self.percent.is_none()
    }
}

/// Reduces a wear reading to `"<int>%"`, taking the first 1-3 digit token.
pub fn normalize_battery(raw: &str) -> BatteryWear {
    let percent = BATTERY_INT
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());

    match percent {
        Some(p) => {
            let value = format!("{p}%");
            let changed = value != raw;
            BatteryWear {
                percent: Some(p),
                value,
                changed,
            }
        }
        None => BatteryWear {
            percent: None,
            value: raw.to_string(),
            changed: false,
        },
    }
}
