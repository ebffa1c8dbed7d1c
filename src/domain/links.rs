use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    pub url: String,
    pub simple: bool,
    /// Content was written (or already present) during discovery
    pub saved: bool,
}

/// Discovered post links in discovery order, without duplicate URLs.
#[derive(Debug, Clone, Default)]
pub struct LinkSet {
    links: Vec<DiscoveredLink>,
    seen: HashSet<String>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    /// Append a link, returning false when its URL was already present.
    pub fn insert(&mut self, link: DiscoveredLink) -> bool {
        if !self.seen.insert(link.url.clone()) {
            return false;
        }
        self.links.push(link);
        true
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiscoveredLink> {
        self.links.iter()
    }

    /// Links whose content still has to be extracted from the post page.
    pub fn pending(&self) -> Vec<&str> {
        self.links
            .iter()
            .filter(|l| !l.saved)
            .map(|l| l.url.as_str())
            .collect()
    }

    pub fn saved_count(&self) -> usize {
        self.links.iter().filter(|l| l.saved).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(url: &str, saved: bool) -> DiscoveredLink {
        DiscoveredLink {
            url: url.to_string(),
            simple: saved,
            saved,
        }
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut links = LinkSet::new();
        assert!(links.insert(link("https://x.com/a/status/1", true)));
        assert!(links.insert(link("https://x.com/a/status/2", false)));
        assert!(!links.insert(link("https://x.com/a/status/1", false)));
        assert!(links.contains("https://x.com/a/status/2"));
        assert_eq!(links.len(), 2);
        assert_eq!(links.saved_count(), 1);
    }

    #[test]
    fn test_iteration_follows_discovery_order() {
        let mut links = LinkSet::new();
        for (url, saved) in [("c", false), ("a", true), ("b", false), ("a", false)] {
            links.insert(link(url, saved));
        }
        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["c", "a", "b"]);
        assert_eq!(links.pending(), vec!["c", "b"]);
    }
}
