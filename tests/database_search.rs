//! Lookup behaviour of the tuning database: specificity, fallthrough to the
//! catch-all group, and totality over arbitrary device fingerprints.

use proptest::prelude::*;

use gllm_blas::database::tables;
use gllm_blas::database::{DatabaseEntry, DeviceEntry, VendorGroup};
use gllm_blas::{Database, DatabaseError, DeviceType, ParameterSet, Precision, StatusCode};

fn embedded() -> Database {
    tables::build(None).expect("embedded tables must validate")
}

fn params(pairs: &[(&str, usize)]) -> ParameterSet {
    pairs.iter().map(|&(k, v)| (k, v)).collect()
}

// ═══════════════════════════════════════════════════════════════════════
// 1. Concrete lookups against the embedded tables
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn exact_device_wins() {
    let db = embedded();
    let p = db.search("Xaxpy", Precision::Single, DeviceType::Gpu, "AMD", "Hawaii").unwrap();
    assert_eq!(p, &params(&[("WGS", 64), ("WPT", 1), ("VW", 2)]));
}

#[test]
fn unknown_device_takes_vendor_default() {
    let db = embedded();
    let p = db.search("Xaxpy", Precision::Single, DeviceType::Gpu, "NVIDIA", "GeForce GT 1030").unwrap();
    assert_eq!(p.get("WGS"), Some(128));
    assert_eq!(p.get("VW"), Some(1));
    let k40 = db.search("Xaxpy", Precision::Single, DeviceType::Gpu, "NVIDIA", "Tesla K40m").unwrap();
    assert_eq!(k40.get("VW"), Some(4));
}

#[test]
fn unmatched_type_falls_through_to_catch_all() {
    let db = embedded();
    // there is only a GPU group for AMD in the Xaxpy single table
    let p = db.search("Xaxpy", Precision::Single, DeviceType::Cpu, "AMD", "Hawaii").unwrap();
    assert_eq!(p, &params(&[("WGS", 128), ("WPT", 1), ("VW", 1)]));
}

#[test]
fn double_reduction_parameters_for_hawaii() {
    let db = embedded();
    let p = db.search("Xdot", Precision::Double, DeviceType::Gpu, "AMD", "Hawaii").unwrap();
    assert_eq!(p, &params(&[("WGS1", 128), ("WGS2", 64)]));
}

#[test]
fn unknown_family_and_missing_precision() {
    let db = embedded();
    assert_eq!(
        db.search("Xgemm", Precision::Single, DeviceType::Gpu, "AMD", "Hawaii"),
        Err(StatusCode::NotImplemented)
    );
    assert_eq!(
        db.search("Xdot", Precision::Half, DeviceType::Gpu, "AMD", "Hawaii"),
        Err(StatusCode::InvalidPrecision)
    );
    assert_eq!(
        db.search("Xger", Precision::Half, DeviceType::Cpu, "Intel", "any"),
        Err(StatusCode::InvalidPrecision)
    );
}

#[test]
fn resolve_merges_families() {
    let db = embedded();
    let merged = db
        .resolve(&["Xaxpy", "Xdot"], Precision::Single, DeviceType::Gpu, "AMD", "Hawaii")
        .unwrap();
    assert_eq!(merged.len(), 5);
    assert_eq!(merged.get("VW"), Some(2));
    assert_eq!(merged.get("WGS1"), Some(256));
}

#[test]
fn resolve_rejects_redefined_parameter() {
    let db = embedded();
    // Xger and Xdot both define WGS1 and WGS2
    assert_eq!(
        db.resolve(&["Xdot", "Xger"], Precision::Single, DeviceType::Gpu, "AMD", "Hawaii"),
        Err(StatusCode::InvalidKernel)
    );
}

// ═══════════════════════════════════════════════════════════════════════
// 2. Registration rules
// ═══════════════════════════════════════════════════════════════════════

fn group(device_type: DeviceType, vendor: &str, devices: &[(&str, usize)]) -> VendorGroup {
    VendorGroup {
        device_type,
        vendor: vendor.to_string(),
        devices: devices
            .iter()
            .map(|&(name, wgs)| DeviceEntry { name: name.to_string(), parameters: params(&[("WGS", wgs)]) })
            .collect(),
    }
}

fn entry(groups: Vec<VendorGroup>) -> DatabaseEntry {
    DatabaseEntry { family: "Xtest".to_string(), precision: Precision::Single, groups }
}

#[test]
fn entry_without_catch_all_is_rejected() {
    let e = entry(vec![group(DeviceType::Gpu, "AMD", &[("default", 64)])]);
    assert!(matches!(Database::from_entries(vec![e]), Err(DatabaseError::MissingCatchAll { .. })));
}

#[test]
fn group_without_default_device_is_rejected() {
    let e = entry(vec![
        group(DeviceType::Gpu, "AMD", &[("Hawaii", 64)]),
        group(DeviceType::All, "default", &[("default", 32)]),
    ]);
    assert!(matches!(Database::from_entries(vec![e]), Err(DatabaseError::MissingDefaultDevice { .. })));
}

#[test]
fn duplicate_registration_is_rejected() {
    let e = entry(vec![group(DeviceType::All, "default", &[("default", 32)])]);
    assert!(matches!(
        Database::from_entries(vec![e.clone(), e]),
        Err(DatabaseError::Duplicate { .. })
    ));
}

#[test]
fn devices_lacking_default_keys_are_rejected() {
    let mut e = entry(vec![
        group(DeviceType::Gpu, "AMD", &[("default", 64)]),
        group(DeviceType::All, "default", &[("default", 32)]),
    ]);
    e.groups[1].devices[0].parameters = params(&[("WGS", 32), ("WPT", 1)]);
    assert!(matches!(Database::from_entries(vec![e]), Err(DatabaseError::MissingKey { .. })));
}

const COPY_WITH_PRECISION_KEYS: &str = r#"{
  "family": "Copy",
  "entries": [
    {
      "precision": "single",
      "groups": [
        {
          "device_type": "gpu", "vendor": "AMD",
          "devices": [
            { "name": "Oland", "parameters": {"COPY_DIMX": 16, "COPY_DIMY": 8, "COPY_WPT": 1, "COPY_VW": 4, "PRECISION": 32} },
            { "name": "default", "parameters": {"COPY_DIMX": 8, "COPY_DIMY": 8, "COPY_WPT": 1, "COPY_VW": 2} }
          ]
        },
        {
          "device_type": "all", "vendor": "default",
          "devices": [
            { "name": "default", "parameters": {"COPY_DIMX": 8, "COPY_DIMY": 8, "COPY_WPT": 1, "COPY_VW": 4} }
          ]
        }
      ]
    }
  ]
}"#;

#[test]
fn device_entries_may_carry_extra_keys() {
    let entries = tables::parse_table("copy.json", COPY_WITH_PRECISION_KEYS).unwrap();
    let db = Database::from_entries(entries).unwrap();

    let oland = db.search("Copy", Precision::Single, DeviceType::Gpu, "AMD", "Oland").unwrap();
    assert_eq!(oland.get("PRECISION"), Some(32));
    assert_eq!(oland.get("COPY_DIMX"), Some(16));

    let other = db.search("Copy", Precision::Single, DeviceType::Gpu, "AMD", "Tahiti").unwrap();
    assert_eq!(other.get("PRECISION"), None);
    assert_eq!(other.get("COPY_VW"), Some(2));

    // the shipped table keeps the same extra key
    let shipped = embedded();
    let oland = shipped.search("Copy", Precision::Single, DeviceType::Gpu, "AMD", "Oland").unwrap();
    assert_eq!(oland.get("PRECISION"), Some(32));
}

// ═══════════════════════════════════════════════════════════════════════
// 3. Properties over arbitrary fingerprints
// ═══════════════════════════════════════════════════════════════════════

fn arb_device_type() -> impl Strategy<Value = DeviceType> {
    prop_oneof![Just(DeviceType::Gpu), Just(DeviceType::Cpu), Just(DeviceType::Accelerator)]
}

fn arb_vendor() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("AMD".to_string()),
        Just("NVIDIA".to_string()),
        Just("Intel".to_string()),
        Just("ARM".to_string()),
        "[A-Za-z]{1,12}",
    ]
}

fn arb_device_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Hawaii".to_string()),
        Just("Tesla K40m".to_string()),
        Just("GeForce GTX 980".to_string()),
        Just("Intel(R) Core(TM) i7-5930K CPU @ 3.50GHz".to_string()),
        "[ -~]{0,32}",
    ]
}

fn arb_precision() -> impl Strategy<Value = Precision> {
    proptest::sample::select(Precision::ALL.to_vec())
}

proptest! {
    /// Every registered (family, precision) resolves for any device.
    #[test]
    fn search_is_total(
        device_type in arb_device_type(),
        vendor in arb_vendor(),
        name in arb_device_name(),
    ) {
        let db = embedded();
        for e in db.entries() {
            let found = db.search(&e.family, e.precision, device_type, &vendor, &name);
            prop_assert!(found.is_ok(), "{}/{} failed for {:?}/{}/{}", e.family, e.precision, device_type, vendor, name);
            let keys = e.key_set().unwrap();
            prop_assert_eq!(found.unwrap().missing_key(keys), None);
        }
    }

    #[test]
    fn search_is_idempotent(
        precision in arb_precision(),
        device_type in arb_device_type(),
        vendor in arb_vendor(),
        name in arb_device_name(),
    ) {
        let db = embedded();
        for family in ["Xaxpy", "Xdot", "Xgemv", "Xger", "Copy"] {
            let first = db.search(family, precision, device_type, &vendor, &name).map(Clone::clone);
            let second = db.search(family, precision, device_type, &vendor, &name).map(Clone::clone);
            prop_assert_eq!(first, second);
        }
    }

    /// A vendor no table mentions always lands on the catch-all entry.
    #[test]
    fn unknown_vendor_uses_catch_all(
        precision in arb_precision(),
        device_type in arb_device_type(),
        name in arb_device_name(),
    ) {
        let db = embedded();
        for e in db.entries().filter(|e| e.precision == precision) {
            let catch_all = &e.groups.last().unwrap().devices.last().unwrap().parameters;
            let found = db.search(&e.family, precision, device_type, "Imagination", &name).unwrap();
            prop_assert_eq!(found, catch_all);
        }
    }

    /// Devices listed under a vendor group get their own parameters back.
    #[test]
    fn listed_devices_are_found_exactly(index in 0usize..64) {
        let db = embedded();
        let listed: Vec<_> = db
            .entries()
            .flat_map(|e| e.groups.iter().map(move |g| (e, g)))
            .filter(|(_, g)| g.device_type != DeviceType::All)
            .flat_map(|(e, g)| g.devices.iter().map(move |d| (e, g, d)))
            .collect();
        let (e, g, d) = listed[index % listed.len()];
        // the first group matching the fingerprint must be this one
        let first = e.groups.iter().position(|x| x.device_type == g.device_type && x.vendor == g.vendor).unwrap();
        let shadowed = e.groups[..first].iter().any(|x| x.device_type == g.device_type && x.vendor == "default");
        prop_assume!(!shadowed);
        let found = db.search(&e.family, e.precision, g.device_type, &g.vendor, &d.name).unwrap();
        prop_assert_eq!(found, &d.parameters);
    }
}
