use std::env;
use std::path::PathBuf;

/// Conventional mount point of the introspection filesystem
pub const DEFAULT_PROC_ROOT: &str = "/proc";

const ENV_PROC_ROOT: &str = "NETOWNER_PROC_ROOT";
const ENV_NETSTAT: &str = "NETOWNER_NETSTAT";
const ENV_LSOF: &str = "NETOWNER_LSOF";

/// Where to look for connection and process information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpyConfig {
    /// Root of the introspection filesystem, `/proc` by default. Point it at
    /// a synthetic tree to test against fixed data.
    pub proc_root: PathBuf,
    /// Connection-listing command for the fallback path
    pub netstat_binary: String,
    /// Open-file-listing command for the fallback path
    pub lsof_binary: String,
    /// Read `net/tcp6` in addition to `net/tcp`
    pub include_ipv6: bool,
}

impl Default for SpyConfig {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            netstat_binary: "netstat".to_string(),
            lsof_binary: "lsof".to_string(),
            include_ipv6: true,
        }
    }
}

impl SpyConfig {
    /// Defaults, overridden by `NETOWNER_PROC_ROOT`, `NETOWNER_NETSTAT` and
    /// `NETOWNER_LSOF` when set
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(root) = env::var_os(ENV_PROC_ROOT).filter(|v| !v.is_empty()) {
            config.proc_root = PathBuf::from(root);
        }
        if let Ok(netstat) = env::var(ENV_NETSTAT) {
            if !netstat.is_empty() {
                config.netstat_binary = netstat;
            }
        }
        if let Ok(lsof) = env::var(ENV_LSOF) {
            if !lsof.is_empty() {
                config.lsof_binary = lsof;
            }
        }
        config
    }

    #[must_use]
    pub fn with_proc_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.proc_root = root.into();
        self
    }

    #[must_use]
    pub fn with_netstat_binary(mut self, binary: impl Into<String>) -> Self {
        self.netstat_binary = binary.into();
        self
    }

    #[must_use]
    pub fn with_lsof_binary(mut self, binary: impl Into<String>) -> Self {
        self.lsof_binary = binary.into();
        self
    }

    #[must_use]
    pub fn with_ipv6(mut self, include: bool) -> Self {
        self.include_ipv6 = include;
        self
    }

    /// Connection tables to read, IPv4 first
    #[must_use]
    pub fn tables(&self) -> Vec<PathBuf> {
        let net = self.proc_root.join("net");
        let mut tables = vec![net.join("tcp")];
        if self.include_ipv6 {
            tables.push(net.join("tcp6"));
        }
        tables
    }

    /// Whether the introspection filesystem is present
    #[must_use]
    pub fn has_proc_root(&self) -> bool {
        self.proc_root.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SpyConfig::default();
        assert_eq!(config.proc_root, PathBuf::from("/proc"));
        assert_eq!(config.netstat_binary, "netstat");
        assert_eq!(config.lsof_binary, "lsof");
        assert_eq!(
            config.tables(),
            vec![PathBuf::from("/proc/net/tcp"), PathBuf::from("/proc/net/tcp6")]
        );
    }

    #[test]
    fn builder_overrides() {
        let config = SpyConfig::default()
            .with_proc_root("/tmp/fake")
            .with_lsof_binary("/usr/sbin/lsof")
            .with_netstat_binary("/usr/sbin/netstat")
            .with_ipv6(false);
        assert_eq!(config.tables(), vec![PathBuf::from("/tmp/fake/net/tcp")]);
        assert_eq!(config.lsof_binary, "/usr/sbin/lsof");
        assert_eq!(config.netstat_binary, "/usr/sbin/netstat");
        assert!(!config.has_proc_root());
    }
}
