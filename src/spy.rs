use log::{debug, warn};

use crate::backend::{Backend, NativeBackend};
use crate::config::SpyConfig;
use crate::error::Result;
use crate::external::{CommandRunner, ExternalBackend, SystemRunner};
use crate::fixture::FixtureBackend;
use crate::types::{Connection, ConnectionProcess, SocketIndex};

/// Entry point for connection discovery
///
/// Picks the native strategy when the introspection filesystem is present
/// and the `netstat`/`lsof` strategy otherwise. If the native strategy finds
/// its root gone at query time, the query is retried on the fallback.
pub struct Spy {
    primary: Box<dyn Backend>,
    fallback: Option<Box<dyn Backend>>,
}

impl std::fmt::Debug for Spy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spy")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.as_ref().map(|b| b.name()))
            .finish()
    }
}

impl Spy {
    /// Select a strategy for `config`
    #[must_use]
    pub fn new(config: SpyConfig) -> Self {
        Self::with_runner(config, SystemRunner)
    }

    /// Select a strategy for the configuration in the environment
    #[must_use]
    pub fn detect() -> Self {
        Self::new(SpyConfig::from_env())
    }

    /// Like [`Spy::new`], running external tools through `runner`
    #[must_use]
    pub fn with_runner<R: CommandRunner + 'static>(config: SpyConfig, runner: R) -> Self {
        let external = ExternalBackend::with_runner(&config, runner);
        if config.has_proc_root() {
            debug!("using {} for discovery", config.proc_root.display());
            Self::with_fallback(NativeBackend::new(config), external)
        } else {
            debug!(
                "{} not found, using external tools",
                config.proc_root.display()
            );
            Self::with_backend(external)
        }
    }

    /// Always answer with `backend`
    #[must_use]
    pub fn with_backend(backend: impl Backend + 'static) -> Self {
        Self {
            primary: Box::new(backend),
            fallback: None,
        }
    }

    /// Answer with `primary`, retrying on `fallback` when the primary's
    /// introspection root is unavailable
    #[must_use]
    pub fn with_fallback(
        primary: impl Backend + 'static,
        fallback: impl Backend + 'static,
    ) -> Self {
        Self {
            primary: Box::new(primary),
            fallback: Some(Box::new(fallback)),
        }
    }

    /// Always answer with fixed data, never touching the live system
    #[must_use]
    pub fn fixtures(connections: Vec<Connection>, index: SocketIndex) -> Self {
        Self::with_backend(FixtureBackend::new(connections, index))
    }

    /// Name of the strategy tried first
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.primary.name()
    }

    /// Established TCP connections
    ///
    /// # Errors
    /// Returns an error only if no strategy can reach its data source
    pub fn connections(&self) -> Result<Vec<Connection>> {
        self.query(|backend| backend.connections())
    }

    /// Established TCP connections with their owning processes
    ///
    /// # Errors
    /// Returns an error only if no strategy can reach its data source
    pub fn processes(&self) -> Result<Vec<ConnectionProcess>> {
        self.query(|backend| backend.processes())
    }

    fn query<T>(&self, op: impl Fn(&dyn Backend) -> Result<T>) -> Result<T> {
        match (op(self.primary.as_ref()), &self.fallback) {
            (Err(e), Some(fallback)) if e.is_root_unavailable() => {
                warn!(
                    "{} backend unavailable ({e}), falling back to {}",
                    self.primary.name(),
                    fallback.name()
                );
                op(fallback.as_ref())
            }
            (result, _) => result,
        }
    }
}

impl Default for Spy {
    fn default() -> Self {
        Self::detect()
    }
}
