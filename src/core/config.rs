/*!
 * Primitives Configuration
 *
 * Runtime configuration for the OS-facing primitives
 */

/// Clock ticks per second assumed when sysconf cannot report it
pub const FALLBACK_CLOCK_TICKS: i64 = 60;

/// Configuration shared by the primitives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitivesConfig {
    /// Name of the thread that runs custom signal callbacks
    pub dispatch_thread_name: String,
    /// Install watched handlers with SA_RESTART
    pub restart_interrupted_syscalls: bool,
    /// Clock tick rate used when sysconf(_SC_CLK_TCK) fails
    pub fallback_clock_ticks: i64,
}

impl Default for PrimitivesConfig {
    fn default() -> Self {
        Self {
            dispatch_thread_name: "signal-dispatch".to_string(),
            restart_interrupted_syscalls: false,
            fallback_clock_ticks: FALLBACK_CLOCK_TICKS,
        }
    }
}

impl PrimitivesConfig {
    /// Configuration where watched signals never interrupt blocking calls
    pub fn restarting() -> Self {
        Self {
            restart_interrupted_syscalls: true,
            ..Self::default()
        }
    }

    /// Build configuration from environment variables
    ///
    /// Environment variables:
    /// - VMPRIM_SA_RESTART: install handlers with SA_RESTART (default: false)
    /// - VMPRIM_DISPATCH_THREAD: signal dispatcher thread name
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var("VMPRIM_SA_RESTART") {
            config.restart_interrupted_syscalls = parse_flag(&value);
        }
        if let Ok(name) = std::env::var("VMPRIM_DISPATCH_THREAD") {
            if !name.trim().is_empty() {
                config.dispatch_thread_name = name;
            }
        }

        config
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PrimitivesConfig::default();
        assert_eq!(config.dispatch_thread_name, "signal-dispatch");
        assert!(!config.restart_interrupted_syscalls);
        assert_eq!(config.fallback_clock_ticks, 60);
    }

    #[test]
    fn test_restarting_preset() {
        assert!(PrimitivesConfig::restarting().restart_interrupted_syscalls);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" TRUE "));
        assert!(parse_flag("on"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("nope"));
    }
}
