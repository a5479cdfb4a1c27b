//! Per-device context shared by routine calls.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::ProgramCache;
use crate::config::{self, BlasConfig};
use crate::database::{self, Database, DatabaseError, ParameterSet};
use crate::error::BlasResult;
use crate::runtime::Backend;
use crate::types::Precision;

/// Owns one backend handle together with its program cache, its tuning
/// overrides and its configuration. Routines borrow it for one call.
pub struct Context<B: Backend> {
    backend: B,
    database: Arc<Database>,
    config: BlasConfig,
    cache: ProgramCache<B::Program>,
    overrides: HashMap<(String, Precision), ParameterSet>,
}

impl<B: Backend> Context<B> {
    /// Context using the process-wide database and configuration.
    pub fn new(backend: B) -> Result<Self, DatabaseError> {
        Ok(Self::with_database(backend, database::global()?, config::global().clone()))
    }

    /// Context with an explicit configuration. A database directory other than
    /// the process-wide one gets its own database.
    pub fn with_config(backend: B, config: BlasConfig) -> Result<Self, DatabaseError> {
        let database = if config.database_dir == config::global().database_dir {
            database::global()?
        } else {
            Arc::new(database::tables::build(config.database_dir.as_deref())?)
        };
        Ok(Self::with_database(backend, database, config))
    }

    pub fn with_database(backend: B, database: Arc<Database>, config: BlasConfig) -> Self {
        let device = backend.device();
        log::debug!(
            "context: {:?} {} {} (max work-group {})",
            device.device_type,
            device.vendor,
            device.name,
            device.max_work_group_size
        );
        Context { backend, database, config, cache: ProgramCache::new(), overrides: HashMap::new() }
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }

    #[inline]
    pub fn config(&self) -> &BlasConfig {
        &self.config
    }

    #[inline]
    pub fn cache(&self) -> &ProgramCache<B::Program> {
        &self.cache
    }

    /// Replaces the tuned parameters of `(family, precision)` for this
    /// context's device. The override must define every parameter name of the
    /// database entry, none of them zero; extra names are kept.
    pub fn override_parameters(
        &mut self,
        family: &str,
        precision: Precision,
        parameters: ParameterSet,
    ) -> Result<(), DatabaseError> {
        let entry = self.database.entry(family, precision).ok_or_else(|| DatabaseError::UnknownEntry {
            family: family.to_string(),
            precision,
        })?;
        if let Some(name) = entry.key_set().and_then(|keys| parameters.missing_key(keys)) {
            return Err(DatabaseError::OverrideMismatch {
                family: family.to_string(),
                precision,
                name: name.to_string(),
            });
        }
        if let Some(name) = parameters.zero_key() {
            return Err(DatabaseError::ZeroParameter {
                family: family.to_string(),
                precision,
                device: self.backend.device().name.clone(),
                name: name.to_string(),
            });
        }
        log::debug!("context: overriding {family}/{precision}");
        self.overrides.insert((family.to_string(), precision), parameters);
        Ok(())
    }

    pub fn clear_override(&mut self, family: &str, precision: Precision) -> bool {
        self.overrides.remove(&(family.to_string(), precision)).is_some()
    }

    /// Resolves and merges the parameters of `families` for this device.
    pub fn parameters(&self, families: &[&str], precision: Precision) -> BlasResult<ParameterSet> {
        let device = self.backend.device();
        database::merge_families(families, |family| match self.overrides.get(&(family.to_string(), precision)) {
            Some(p) => Ok(p),
            None => self.database.search(family, precision, device.device_type, &device.vendor, &device.name),
        })
    }
}
