//! CPU client and its configuration

use crate::error::{Error, Result};
use crate::runtime::Device;
#[cfg(feature = "rayon")]
use std::sync::Arc;

/// Default number of ids handled by one parallel unit of the hash map build
pub const DEFAULT_HASH_GRAIN: usize = 1024;

/// Default minimum number of items per rayon task
pub const DEFAULT_MIN_LEN: usize = 64;

/// Configuration of a [`CpuClient`]
///
/// # Example
///
/// ```
/// use graphr::runtime::cpu::{ClientConfig, CpuClient};
///
/// let config = ClientConfig::default().with_num_threads(2).with_seed(42);
/// let client = CpuClient::with_config(config).unwrap();
/// assert_eq!(client.seed(), Some(42));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Size of a dedicated thread pool; `None` runs on the global rayon pool
    pub num_threads: Option<usize>,
    /// Minimum number of items per rayon task
    pub min_len: usize,
    /// Number of ids per parallel unit when building an [`IdHashMap`](super::IdHashMap)
    pub hash_grain: usize,
    /// Base seed for sampling; `None` draws a fresh seed per call
    pub seed: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            min_len: DEFAULT_MIN_LEN,
            hash_grain: DEFAULT_HASH_GRAIN,
            seed: None,
        }
    }
}

impl ClientConfig {
    /// Environment variable holding the thread count
    pub const ENV_NUM_THREADS: &'static str = "GRAPHR_NUM_THREADS";
    /// Environment variable holding the rayon minimum task length
    pub const ENV_MIN_LEN: &'static str = "GRAPHR_MIN_LEN";
    /// Environment variable holding the hash map grain
    pub const ENV_HASH_GRAIN: &'static str = "GRAPHR_HASH_GRAIN";
    /// Environment variable holding the sampling seed
    pub const ENV_SEED: &'static str = "GRAPHR_SEED";

    /// Set the size of the dedicated thread pool
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Set the minimum number of items per rayon task
    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    /// Set the hash map build grain
    pub fn with_hash_grain(mut self, hash_grain: usize) -> Self {
        self.hash_grain = hash_grain;
        self
    }

    /// Fix the base seed used by sampling operations
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build a configuration from `GRAPHR_*` environment variables
    ///
    /// Unset variables keep their default; malformed ones are an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(v) = lookup(Self::ENV_NUM_THREADS) {
            config.num_threads = Some(parse_env(Self::ENV_NUM_THREADS, &v)?);
        }
        if let Some(v) = lookup(Self::ENV_MIN_LEN) {
            config.min_len = parse_env(Self::ENV_MIN_LEN, &v)?;
        }
        if let Some(v) = lookup(Self::ENV_HASH_GRAIN) {
            config.hash_grain = parse_env(Self::ENV_HASH_GRAIN, &v)?;
        }
        if let Some(v) = lookup(Self::ENV_SEED) {
            config.seed = Some(parse_env(Self::ENV_SEED, &v)?);
        }
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.num_threads == Some(0) {
            return Err(Error::invalid_argument(
                "num_threads",
                "thread pool size must be at least 1",
            ));
        }
        if self.hash_grain == 0 {
            return Err(Error::invalid_argument(
                "hash_grain",
                "grain must be at least 1",
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::invalid_argument(key, format!("cannot parse '{}'", value))
    })
}

/// CPU client for operation dispatch
///
/// Every graph kernel of this crate is a method of one of the op traits
/// ([`SamplingOps`](crate::ops::SamplingOps),
/// [`MessagePassingOps`](crate::ops::MessagePassingOps),
/// [`CompactionOps`](crate::ops::CompactionOps)) implemented on this client.
#[derive(Clone, Debug)]
pub struct CpuClient {
    pub(crate) device: Device,
    config: ClientConfig,
    #[cfg(feature = "rayon")]
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl Default for CpuClient {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuClient {
    /// Create a client running on the global thread pool
    pub fn new() -> Self {
        Self {
            device: Device::Cpu,
            config: ClientConfig::default(),
            #[cfg(feature = "rayon")]
            pool: None,
        }
    }

    /// Create a client from an explicit configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        #[cfg(feature = "rayon")]
        let pool = match config.num_threads {
            Some(n) => Some(Arc::new(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("graphr-cpu-{}", i))
                    .build()
                    .map_err(|e| Error::Internal(format!("failed to build thread pool: {}", e)))?,
            )),
            None => None,
        };

        tracing::debug!(
            num_threads = ?config.num_threads,
            min_len = config.min_len,
            hash_grain = config.hash_grain,
            seed = ?config.seed,
            "created cpu client"
        );

        Ok(Self {
            device: Device::Cpu,
            config,
            #[cfg(feature = "rayon")]
            pool,
        })
    }

    /// Device this client executes on
    pub fn device(&self) -> Device {
        self.device
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Minimum number of items per rayon task
    #[inline]
    pub fn rayon_min_len(&self) -> usize {
        self.config.min_len.max(1)
    }

    /// Number of ids per parallel unit of the hash map build
    #[inline]
    pub fn hash_grain(&self) -> usize {
        self.config.hash_grain.max(1)
    }

    /// Configured sampling seed
    #[inline]
    pub fn seed(&self) -> Option<u64> {
        self.config.seed
    }

    /// Run `f` inside this client's thread pool
    ///
    /// Without a dedicated pool (or without the `rayon` feature) `f` runs on
    /// the calling thread, and any parallel iterator inside it uses the
    /// global pool.
    pub fn install_parallelism<R: Send>(&self, f: impl FnOnce() -> R + Send) -> R {
        #[cfg(feature = "rayon")]
        {
            if let Some(pool) = &self.pool {
                return pool.install(f);
            }
        }
        f()
    }

    /// Fail unless `device` is the device of this client
    pub(crate) fn check_device(&self, device: Device, op: &'static str) -> Result<()> {
        if device.is_cpu() {
            Ok(())
        } else {
            Err(Error::UnsupportedDevice { device, op })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_from_env() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("GRAPHR_NUM_THREADS", "3"),
            ("GRAPHR_SEED", " 17 "),
        ]))
        .unwrap();
        assert_eq!(config.num_threads, Some(3));
        assert_eq!(config.seed, Some(17));
        assert_eq!(config.hash_grain, DEFAULT_HASH_GRAIN);
    }

    #[test]
    fn test_config_from_env_rejects_garbage() {
        let err = ClientConfig::from_lookup(lookup(&[("GRAPHR_MIN_LEN", "lots")])).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidArgument {
                arg: "GRAPHR_MIN_LEN",
                ..
            }
        ));
        assert!(ClientConfig::from_lookup(lookup(&[("GRAPHR_HASH_GRAIN", "0")])).is_err());
    }

    #[test]
    fn test_install_parallelism_runs_closure() {
        let client = CpuClient::with_config(ClientConfig::default().with_num_threads(2)).unwrap();
        assert_eq!(client.install_parallelism(|| 21 * 2), 42);
    }

    #[test]
    fn test_rejects_accelerator_device() {
        let client = CpuClient::new();
        assert!(client.check_device(Device::Cpu, "op").is_ok());
        assert!(matches!(
            client.check_device(Device::Cuda(0), "op"),
            Err(Error::UnsupportedDevice { .. })
        ));
    }
}
