use indexmap::IndexSet;

/// Packages satisfied by the host runtime instead of the module graph.
///
/// Entries are either exact package names, `prefix.*` wildcards matching
/// every package below `prefix.`, or `*` matching everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootDelegation {
    match_all: bool,
    exact: IndexSet<String>,
    prefixes: Vec<String>,
}

impl BootDelegation {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut delegation = BootDelegation::default();
        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }
            if entry == "*" {
                delegation.match_all = true;
            } else if let Some(prefix) = entry.strip_suffix('*') {
                if prefix.ends_with('.') {
                    delegation.prefixes.push(prefix.to_string());
                } else {
                    log::warn!("Ignoring malformed boot delegation entry \"{}\"", entry);
                }
            } else {
                delegation.exact.insert(entry.to_string());
            }
        }
        delegation
    }

    pub fn matches(&self, package: &str) -> bool {
        self.match_all
            || self.exact.contains(package)
            || self.prefixes.iter().any(|prefix| package.starts_with(prefix.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        !self.match_all && self.exact.is_empty() && self.prefixes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_prefix_entries() {
        let delegation = BootDelegation::new(["java.*", "sun.misc", " "]);
        assert!(delegation.matches("java.lang"));
        assert!(delegation.matches("java.util.concurrent"));
        assert!(!delegation.matches("java"));
        assert!(!delegation.matches("javax.net"));
        assert!(delegation.matches("sun.misc"));
        assert!(!delegation.matches("sun.misc.unsafe"));
    }

    #[test]
    fn test_match_all() {
        let delegation = BootDelegation::new(["*"]);
        assert!(delegation.matches("anything.at.all"));
    }

    #[test]
    fn test_malformed_wildcard_ignored() {
        let delegation = BootDelegation::new(["com.acme*"]);
        assert!(delegation.is_empty());
        assert!(!delegation.matches("com.acme"));
    }
}
