//! Architecture compatibility

/// Compatibility chains, best match first. `noarch` is appended implicitly.
const ARCH_CHAINS: &[(&str, &[&str])] = &[
    ("x86_64", &["x86_64", "i686", "i586", "i486", "i386"]),
    ("i686", &["i686", "i586", "i486", "i386"]),
    ("i586", &["i586", "i486", "i386"]),
    ("i486", &["i486", "i386"]),
    ("i386", &["i386"]),
    ("aarch64", &["aarch64"]),
    ("armv7hl", &["armv7hl", "armv7l", "armv6l", "armv5tel"]),
    ("armv7l", &["armv7l", "armv6l", "armv5tel"]),
    ("armv6l", &["armv6l", "armv5tel"]),
    ("ppc64le", &["ppc64le"]),
    ("ppc64", &["ppc64", "ppc"]),
    ("ppc", &["ppc"]),
    ("s390x", &["s390x", "s390"]),
    ("s390", &["s390"]),
    ("riscv64", &["riscv64"]),
];

pub const NOARCH: &str = "noarch";

/// Whether `arch` names an architecture this table knows about
pub fn is_known_arch(arch: &str) -> bool {
    matches!(arch, NOARCH | "src" | "nosrc")
        || ARCH_CHAINS
            .iter()
            .any(|(name, chain)| *name == arch || chain.contains(&arch))
}

/// Architecture preference for the configured system architecture
#[derive(Debug, Clone, Default)]
pub struct ArchPolicy {
    system: Option<String>,
    chain: Vec<String>,
}

impl ArchPolicy {
    pub fn new(system: &str) -> Self {
        let chain = ARCH_CHAINS
            .iter()
            .find(|(name, _)| *name == system)
            .map(|(_, chain)| chain.iter().map(|a| a.to_string()).collect())
            .unwrap_or_else(|| vec![system.to_string()]);

        Self {
            system: Some(system.to_string()),
            chain,
        }
    }

    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    /// Preference score, lower is better; `None` when never installable here.
    pub fn score(&self, arch: &str) -> Option<u32> {
        if arch == "src" || arch == "nosrc" {
            return None;
        }
        if self.system.is_none() {
            return Some(0);
        }
        if arch == NOARCH {
            return Some(self.chain.len() as u32);
        }
        self.chain.iter().position(|a| a == arch).map(|i| i as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_accepts_binary_arches() {
        let policy = ArchPolicy::default();
        assert_eq!(policy.score("x86_64"), Some(0));
        assert_eq!(policy.score("sparc"), Some(0));
        assert_eq!(policy.score("src"), None);
    }

    #[test]
    fn test_x86_64_prefers_native() {
        let policy = ArchPolicy::new("x86_64");
        let native = policy.score("x86_64").unwrap();
        let compat = policy.score("i686").unwrap();
        let noarch = policy.score("noarch").unwrap();
        assert!(native < compat);
        assert!(compat < noarch);
        assert_eq!(policy.score("aarch64"), None);
        assert_eq!(policy.score("nosrc"), None);
    }

    #[test]
    fn test_narrow_system_rejects_wider_arch() {
        let policy = ArchPolicy::new("i686");
        assert_eq!(policy.score("x86_64"), None);
        assert!(policy.score("i386").is_some());
    }

    #[test]
    fn test_unknown_system_arch() {
        let policy = ArchPolicy::new("mips");
        assert_eq!(policy.score("mips"), Some(0));
        assert_eq!(policy.score("noarch"), Some(1));
        assert_eq!(policy.score("x86_64"), None);
    }

    #[test]
    fn test_known_arches() {
        assert!(is_known_arch("x86_64"));
        assert!(is_known_arch("armv5tel"));
        assert!(is_known_arch("noarch"));
        assert!(!is_known_arch("so"));
        assert!(!is_known_arch("9"));
    }
}
