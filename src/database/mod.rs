//! Tuning parameter database.
//!
//! Maps `(kernel family, precision)` to vendor groups, and each vendor group
//! to per-device parameter sets. Lookup walks three levels:
//!
//! 1. exact `(family, precision)` entry,
//! 2. first vendor group whose device type and vendor match (the `all` type and
//!    the `default` vendor match anything),
//! 3. exact device name inside that group, else its `default` entry.
//!
//! Every entry ends with an `{all, default}` group and every group ends with a
//! `default` device, so steps 2 and 3 always succeed on a loaded database.
//! Those sentinels are checked once when entries are registered.

pub mod tables;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::StatusCode;
use crate::types::Precision;

/// Reserved name for the catch-all vendor and device entries.
pub const DEFAULT_NAME: &str = "default";

/// Device type tag of a vendor group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Gpu,
    Cpu,
    Accelerator,
    /// Matches any device type.
    All,
}

impl DeviceType {
    #[inline]
    fn matches(self, queried: DeviceType) -> bool {
        self == DeviceType::All || self == queried
    }
}

/// Named integer tuning knobs, kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, usize>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<usize> {
        self.0.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: usize) -> Option<usize> {
        self.0.insert(name.into(), value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First parameter name of `required` this set lacks.
    pub fn missing_key<'r>(&self, required: &'r ParameterSet) -> Option<&'r str> {
        required.keys().find(|k| !self.0.contains_key(*k))
    }

    /// First parameter set to zero. Tuning values size launches, so none may be zero.
    pub fn zero_key(&self) -> Option<&str> {
        self.0.iter().find(|(_, v)| **v == 0).map(|(k, _)| k.as_str())
    }

    /// Adds every parameter of `other`. Returns the first name both sets
    /// define; `self` is left unchanged in that case.
    pub fn merge(&mut self, other: &ParameterSet) -> Result<(), String> {
        if let Some(dup) = other.0.keys().find(|k| self.0.contains_key(*k)) {
            return Err(dup.clone());
        }
        self.0.extend(other.0.iter().map(|(k, v)| (k.clone(), *v)));
        Ok(())
    }
}

impl<K: Into<String>> FromIterator<(K, usize)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, usize)>>(iter: I) -> Self {
        ParameterSet(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Parameters tuned for one device name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub name: String,
    pub parameters: ParameterSet,
}

/// Devices of one `(device type, vendor)` pair, in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorGroup {
    pub device_type: DeviceType,
    pub vendor: String,
    pub devices: Vec<DeviceEntry>,
}

impl VendorGroup {
    #[inline]
    fn matches(&self, device_type: DeviceType, vendor: &str) -> bool {
        self.device_type.matches(device_type) && (self.vendor == vendor || self.vendor == DEFAULT_NAME)
    }

    fn is_catch_all(&self) -> bool {
        self.device_type == DeviceType::All && self.vendor == DEFAULT_NAME
    }

    fn find_device(&self, name: &str) -> Option<&DeviceEntry> {
        self.devices
            .iter()
            .find(|d| d.name == name)
            .or_else(|| self.devices.iter().find(|d| d.name == DEFAULT_NAME))
    }
}

/// All tuning data of one `(family, precision)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseEntry {
    pub family: String,
    pub precision: Precision,
    pub groups: Vec<VendorGroup>,
}

impl DatabaseEntry {
    /// Parameter names every device of this entry defines: those of the
    /// catch-all device. Other devices may carry extra names.
    pub fn key_set(&self) -> Option<&ParameterSet> {
        self.groups.last()?.devices.last().map(|d| &d.parameters)
    }

    fn validate(&self) -> Result<(), DatabaseError> {
        let last = self.groups.last().ok_or_else(|| self.missing_catch_all())?;
        if !last.is_catch_all() {
            return Err(self.missing_catch_all());
        }
        let required = last.devices.last().map(|d| &d.parameters);
        for group in &self.groups {
            match group.devices.last() {
                Some(d) if d.name == DEFAULT_NAME => {}
                _ => {
                    return Err(DatabaseError::MissingDefaultDevice {
                        family: self.family.clone(),
                        precision: self.precision,
                        vendor: group.vendor.clone(),
                    })
                }
            }
            for device in &group.devices {
                if device.parameters.is_empty() {
                    return Err(DatabaseError::EmptyParameters {
                        family: self.family.clone(),
                        precision: self.precision,
                        device: device.name.clone(),
                    });
                }
                if let Some(name) = device.parameters.zero_key() {
                    return Err(DatabaseError::ZeroParameter {
                        family: self.family.clone(),
                        precision: self.precision,
                        device: device.name.clone(),
                        name: name.to_string(),
                    });
                }
                if let Some(name) = required.and_then(|r| device.parameters.missing_key(r)) {
                    return Err(DatabaseError::MissingKey {
                        family: self.family.clone(),
                        precision: self.precision,
                        vendor: group.vendor.clone(),
                        device: device.name.clone(),
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn missing_catch_all(&self) -> DatabaseError {
        DatabaseError::MissingCatchAll { family: self.family.clone(), precision: self.precision }
    }
}

#[derive(Debug, Error, Clone)]
pub enum DatabaseError {
    #[error("{family}/{precision}: last vendor group must be {{all, default}}")]
    MissingCatchAll { family: String, precision: Precision },
    #[error("{family}/{precision}: vendor group {vendor} must end with a default device")]
    MissingDefaultDevice { family: String, precision: Precision, vendor: String },
    #[error("{family}/{precision}: device {device} has no parameters")]
    EmptyParameters { family: String, precision: Precision, device: String },
    #[error("{family}/{precision}: {vendor}/{device} lacks parameter {name} of the default entry")]
    MissingKey { family: String, precision: Precision, vendor: String, device: String, name: String },
    #[error("{family}/{precision}: {device} sets parameter {name} to zero")]
    ZeroParameter { family: String, precision: Precision, device: String, name: String },
    #[error("{family}/{precision}: registered more than once")]
    Duplicate { family: String, precision: Precision },
    #[error("{family}/{precision}: override lacks parameter {name} of the database entry")]
    OverrideMismatch { family: String, precision: Precision, name: String },
    #[error("{family}/{precision}: no database entry to override")]
    UnknownEntry { family: String, precision: Precision },
    #[error("failed to parse tuning table {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: Arc<serde_json::Error>,
    },
    #[error("failed to read tuning tables from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: Arc<std::io::Error>,
    },
}

/// Validated, read-only collection of database entries.
#[derive(Debug, Clone, Default)]
pub struct Database {
    entries: Vec<DatabaseEntry>,
    index: HashMap<(String, Precision), usize>,
    families: HashMap<String, Vec<Precision>>,
}

impl Database {
    /// Registers `entries`, rejecting malformed or duplicated ones.
    pub fn from_entries(entries: Vec<DatabaseEntry>) -> Result<Self, DatabaseError> {
        let mut db = Database::default();
        for entry in entries {
            db.insert(entry, false)?;
        }
        Ok(db)
    }

    /// Adds `entries` on top of this database. An entry for an already
    /// registered pair replaces the existing one; duplicates within `entries`
    /// are still rejected.
    pub fn extend_replacing(&mut self, entries: Vec<DatabaseEntry>) -> Result<(), DatabaseError> {
        let incoming = Database::from_entries(entries)?;
        for entry in incoming.entries {
            self.insert(entry, true)?;
        }
        Ok(())
    }

    fn insert(&mut self, entry: DatabaseEntry, replace: bool) -> Result<(), DatabaseError> {
        entry.validate()?;
        let key = (entry.family.clone(), entry.precision);
        match self.index.get(&key) {
            Some(&slot) if replace => {
                log::debug!("database: replacing {}/{}", entry.family, entry.precision);
                self.entries[slot] = entry;
            }
            Some(_) => {
                return Err(DatabaseError::Duplicate { family: entry.family, precision: entry.precision })
            }
            None => {
                self.families.entry(entry.family.clone()).or_default().push(entry.precision);
                self.index.insert(key, self.entries.len());
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    pub fn entry(&self, family: &str, precision: Precision) -> Option<&DatabaseEntry> {
        self.index
            .get(&(family.to_string(), precision))
            .map(|&i| &self.entries[i])
    }

    pub fn has_family(&self, family: &str) -> bool {
        self.families.contains_key(family)
    }

    /// Precisions registered for `family`, in registration order.
    pub fn precisions(&self, family: &str) -> &[Precision] {
        self.families.get(family).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entries(&self) -> impl Iterator<Item = &DatabaseEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the parameter set for one device fingerprint.
    ///
    /// Unknown families yield `NotImplemented`; a known family without an
    /// entry for `precision` yields `InvalidPrecision`.
    pub fn search(
        &self,
        family: &str,
        precision: Precision,
        device_type: DeviceType,
        vendor: &str,
        device_name: &str,
    ) -> Result<&ParameterSet, StatusCode> {
        let entry = match self.entry(family, precision) {
            Some(e) => e,
            None if self.has_family(family) => return Err(StatusCode::InvalidPrecision),
            None => return Err(StatusCode::NotImplemented),
        };
        let group = entry.groups.iter().find(|g| g.matches(device_type, vendor));
        match group.and_then(|g| g.find_device(device_name)) {
            Some(device) => {
                log::debug!(
                    "database: {family}/{precision} for {device_type:?}/{vendor}/{device_name} -> {}/{}",
                    group.map(|g| g.vendor.as_str()).unwrap_or(DEFAULT_NAME),
                    device.name
                );
                Ok(&device.parameters)
            }
            None => {
                log::error!("database: {family}/{precision} has no fallback entry");
                Err(StatusCode::InvalidKernel)
            }
        }
    }

    /// Resolves and merges the parameter sets of several families.
    pub fn resolve(
        &self,
        families: &[&str],
        precision: Precision,
        device_type: DeviceType,
        vendor: &str,
        device_name: &str,
    ) -> Result<ParameterSet, StatusCode> {
        merge_families(families, |family| self.search(family, precision, device_type, vendor, device_name))
    }
}

/// Merges the parameter sets `lookup` yields for each family, in order. A
/// family redefining an earlier family's parameter is a configuration error.
pub fn merge_families<'a>(
    families: &[&str],
    mut lookup: impl FnMut(&str) -> Result<&'a ParameterSet, StatusCode>,
) -> Result<ParameterSet, StatusCode> {
    let mut merged = ParameterSet::new();
    for family in families {
        merged.merge(lookup(family)?).map_err(|dup| {
            log::error!("database: family {family} redefines parameter {dup}");
            StatusCode::InvalidKernel
        })?;
    }
    Ok(merged)
}

static DATABASE: OnceLock<Result<Arc<Database>, DatabaseError>> = OnceLock::new();

/// Process-wide database: embedded tables plus the tables found in
/// `GLLM_BLAS_DATABASE_DIR`. Built on first use, never mutated afterwards.
pub fn global() -> Result<Arc<Database>, DatabaseError> {
    DATABASE
        .get_or_init(|| {
            let dir = crate::config::global().database_dir.as_deref();
            tables::build(dir).map(Arc::new)
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(wgs: usize) -> ParameterSet {
        [("WGS", wgs), ("WPT", 1)].into_iter().collect()
    }

    fn device(name: &str, wgs: usize) -> DeviceEntry {
        DeviceEntry { name: name.to_string(), parameters: params(wgs) }
    }

    fn group(device_type: DeviceType, vendor: &str, devices: Vec<DeviceEntry>) -> VendorGroup {
        VendorGroup { device_type, vendor: vendor.to_string(), devices }
    }

    fn sample_entry() -> DatabaseEntry {
        DatabaseEntry {
            family: "Xtest".to_string(),
            precision: Precision::Single,
            groups: vec![
                group(DeviceType::Gpu, "AMD", vec![device("Hawaii", 64), device(DEFAULT_NAME, 32)]),
                group(DeviceType::Gpu, "NVIDIA", vec![device("Tesla K40m", 512), device(DEFAULT_NAME, 128)]),
                group(DeviceType::All, DEFAULT_NAME, vec![device(DEFAULT_NAME, 16)]),
            ],
        }
    }

    #[test]
    fn test_search_exact_device() {
        let db = Database::from_entries(vec![sample_entry()]).unwrap();
        let p = db.search("Xtest", Precision::Single, DeviceType::Gpu, "AMD", "Hawaii").unwrap();
        assert_eq!(p.get("WGS"), Some(64));
    }

    #[test]
    fn test_search_vendor_default_device() {
        let db = Database::from_entries(vec![sample_entry()]).unwrap();
        let p = db.search("Xtest", Precision::Single, DeviceType::Gpu, "AMD", "Fiji").unwrap();
        assert_eq!(p.get("WGS"), Some(32));
    }

    #[test]
    fn test_search_type_mismatch_falls_through() {
        let db = Database::from_entries(vec![sample_entry()]).unwrap();
        let p = db.search("Xtest", Precision::Single, DeviceType::Cpu, "AMD", "Hawaii").unwrap();
        assert_eq!(p.get("WGS"), Some(16));
    }

    #[test]
    fn test_search_unknown_family_and_precision() {
        let db = Database::from_entries(vec![sample_entry()]).unwrap();
        assert_eq!(
            db.search("Xnope", Precision::Single, DeviceType::Gpu, "AMD", "x").unwrap_err(),
            StatusCode::NotImplemented
        );
        assert_eq!(
            db.search("Xtest", Precision::Double, DeviceType::Gpu, "AMD", "x").unwrap_err(),
            StatusCode::InvalidPrecision
        );
    }

    #[test]
    fn test_rejects_missing_catch_all() {
        let mut entry = sample_entry();
        entry.groups.pop();
        assert!(matches!(
            Database::from_entries(vec![entry]),
            Err(DatabaseError::MissingCatchAll { .. })
        ));
    }

    #[test]
    fn test_rejects_missing_default_device() {
        let mut entry = sample_entry();
        entry.groups[1].devices.pop();
        assert!(matches!(
            Database::from_entries(vec![entry]),
            Err(DatabaseError::MissingDefaultDevice { ref vendor, .. }) if vendor == "NVIDIA"
        ));
    }

    #[test]
    fn test_extra_device_keys_are_accepted() {
        let mut entry = sample_entry();
        entry.groups[0].devices[0].parameters.insert("PRECISION", 32);
        let db = Database::from_entries(vec![entry]).unwrap();
        let p = db.search("Xtest", Precision::Single, DeviceType::Gpu, "AMD", "Hawaii").unwrap();
        assert_eq!(p.get("PRECISION"), Some(32));
        assert_eq!(db.entry("Xtest", Precision::Single).unwrap().key_set().unwrap().len(), 2);
    }

    #[test]
    fn test_rejects_zero_value() {
        let mut entry = sample_entry();
        entry.groups[1].devices[0].parameters.insert("WGS", 0);
        assert!(matches!(
            Database::from_entries(vec![entry]),
            Err(DatabaseError::ZeroParameter { ref device, ref name, .. }) if device == "Tesla K40m" && name == "WGS"
        ));
    }

    #[test]
    fn test_rejects_missing_keys_and_duplicates() {
        let mut entry = sample_entry();
        entry.groups[0].devices[0].parameters = [("WGS", 64usize)].into_iter().collect();
        assert!(matches!(
            Database::from_entries(vec![entry]),
            Err(DatabaseError::MissingKey { ref name, .. }) if name == "WPT"
        ));
        assert!(matches!(
            Database::from_entries(vec![sample_entry(), sample_entry()]),
            Err(DatabaseError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_extend_replacing_swaps_entry() {
        let mut db = Database::from_entries(vec![sample_entry()]).unwrap();
        let mut replacement = sample_entry();
        replacement.groups = vec![group(DeviceType::All, DEFAULT_NAME, vec![device(DEFAULT_NAME, 8)])];
        db.extend_replacing(vec![replacement]).unwrap();
        assert_eq!(db.len(), 1);
        let p = db.search("Xtest", Precision::Single, DeviceType::Gpu, "AMD", "Hawaii").unwrap();
        assert_eq!(p.get("WGS"), Some(8));
    }

    #[test]
    fn test_resolve_merges_and_rejects_redefinition() {
        let mut other = sample_entry();
        other.family = "Xother".to_string();
        for g in &mut other.groups {
            for d in &mut g.devices {
                d.parameters = [("VW", 4usize)].into_iter().collect();
            }
        }
        let db = Database::from_entries(vec![sample_entry(), other]).unwrap();
        let merged = db
            .resolve(&["Xtest", "Xother"], Precision::Single, DeviceType::Gpu, "NVIDIA", "x")
            .unwrap();
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get("WGS"), Some(128));
        assert_eq!(
            db.resolve(&["Xtest", "Xtest"], Precision::Single, DeviceType::Gpu, "NVIDIA", "x")
                .unwrap_err(),
            StatusCode::InvalidKernel
        );
    }
}
