use asset_grader::grade::DefectSet;
use asset_grader::normalize::{cpu_needs_normalization, normalize_battery, normalize_cpu};

#[test]
fn intel_cpu_is_reduced_to_model_number() {
    let out = normalize_cpu("Intel(R) Core(TM) i5-8250U CPU @ 1.60GHz");
    assert_eq!(out.value, "i5-8250U");
    assert!(out.changed);
}

#[test]
fn repeated_sockets_collapse_with_multiplicity() {
    let out = normalize_cpu(
        "Intel(R) Core(TM) i5-8250U CPU @ 1.60GHz, Intel(R) Core(TM) i5-8250U CPU @ 1.60GHz",
    );
    assert_eq!(out.value, "i5-8250U (x2)");
}

#[test]
fn distinct_entries_keep_first_seen_order() {
    let out = normalize_cpu(
        "Intel(R) Xeon(R) CPU E5-2670 @ 2.60GHz,Intel(R) Core(TM) i7-8700 CPU @ 3.20GHz,Intel(R) Xeon(R) CPU E5-2670 @ 2.60GHz",
    );
    assert_eq!(out.value, "Xeon E5-2670 (x2), i7-8700");
}

#[test]
fn newer_intel_and_amd_strings() {
    assert_eq!(
        normalize_cpu("11th Gen Intel(R) Core(TM) i5-1135G7 @ 2.40GHz").value,
        "i5-1135G7"
    );
    assert_eq!(
        normalize_cpu("AMD Ryzen 5 PRO 3500U w/ Radeon Vega Mobile Gfx").value,
        "Ryzen 5 PRO 3500U"
    );
    assert_eq!(
        normalize_cpu("AMD Ryzen 7 3700X 8-Core Processor").value,
        "Ryzen 7 3700X"
    );
    assert_eq!(normalize_cpu("Intel® Core™ i7-10610U CPU @ 1.80GHz").value, "i7-10610U");
}

#[test]
fn vendor_markers_count_as_raw_without_clock_speed() {
    assert!(cpu_needs_normalization("AMD Ryzen 7 3700X 8-Core Processor"));
    assert!(cpu_needs_normalization("Intel(R) Pentium(R) Silver N5000"));
    assert!(cpu_needs_normalization("Celeron™ N4020"));
    assert!(!cpu_needs_normalization("Celeron N4020"));
    assert!(!cpu_needs_normalization("Ryzen 7 3700X"));

    let out = normalize_cpu("Celeron N4020");
    assert_eq!(out.value, "Celeron N4020");
    assert!(!out.changed);
}

#[test]
fn normalization_is_idempotent() {
    for raw in ["i5-8250U", "i5-8250U (x2)", "Ryzen 5 PRO 3500U", "Xeon E5-2670 (x2), i7-8700"] {
        assert!(!cpu_needs_normalization(raw), "{raw}");
        let out = normalize_cpu(raw);
        assert_eq!(out.value, raw);
        assert!(!out.changed);
    }
    let once = normalize_cpu("Intel(R) Core(TM) i5-8250U CPU @ 1.60GHz").value;
    assert_eq!(normalize_cpu(&once).value, once);
}

#[test]
fn battery_low_wear_injects_defect_only_into_empty_set() {
    let wear = normalize_battery("55");
    assert_eq!(wear.value, "55%");
    assert_eq!(wear.percent, Some(55));
    assert!(wear.changed);

    let mut empty = DefectSet::merge(&[], &[]);
    assert!(empty.inject_low_battery(55, 60));
    assert_eq!(empty.labels(), ["Battery 55%".to_string()].as_slice());

    let mut defective = DefectSet::merge(&["Dead pixels".to_string()], &[]);
    assert!(!defective.inject_low_battery(55, 60));
    assert_eq!(defective.labels(), ["Dead pixels".to_string()].as_slice());
}

#[test]
fn battery_above_threshold_adds_nothing() {
    let wear = normalize_battery("72");
    assert_eq!(wear.value, "72%");
    let mut set = DefectSet::merge(&[], &[]);
    assert!(!set.inject_low_battery(72, 60));
    assert!(set.is_unrecorded());
    // exactly at the threshold is a pass
    assert!(!set.inject_low_battery(60, 60));
}

#[test]
fn battery_variants() {
    let canonical = normalize_battery("81%");
    assert_eq!(canonical.value, "81%");
    assert!(!canonical.changed);

    assert_eq!(normalize_battery("Wear level: 43.7 %").value, "43%");

    let junk = normalize_battery("unknown");
    assert!(junk.is_unparsable());
    assert_eq!(junk.value, "unknown");
    assert!(!junk.changed);

    assert!(normalize_battery("1234").is_unparsable());
}
