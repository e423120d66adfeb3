use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub const DEFAULT_NAME: &str = "XAVIER NOVA";
pub const DEFAULT_USERNAME: &str = "SYSTEM_ARCHIVE_0X1";
pub const DEFAULT_BIO: &str = "SYTHESIZING DIGITAL DIMENSIONS THROUGH HIGH-FIDELITY ARCHIVECTURE.";
pub const DEFAULT_AVATAR: &str = "https://images.unsplash.com/photo-1539571696357-5a69c17a67c6?auto=format&fit=crop&q=80&w=400&h=400";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub username: String,
    /// Stored exactly as produced; refinement output is upper-cased before it lands here.
    pub bio: String,
    pub avatar: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            bio: DEFAULT_BIO.to_string(),
            avatar: DEFAULT_AVATAR.to_string(),
        }
    }
}

impl Profile {
    pub fn with_bio(&self, bio: String) -> Self {
        Self {
            bio,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub id: String,
    pub name: String,
    pub url: String,
    /// Key into the client-side icon catalog.
    pub icon: String,
    pub color: String,
    pub visible: bool,
}

/// Ordered link collection. Display order is collection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkCollection(Vec<SocialLink>);

impl LinkCollection {
    pub fn new(links: Vec<SocialLink>) -> Self {
        Self(links)
    }

    pub fn as_slice(&self) -> &[SocialLink] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SocialLink> {
        self.0.iter().find(|link| link.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.0.iter().position(|link| link.id == id)
    }

    /// Links exposed on the public page, in collection order.
    pub fn visible(&self) -> Vec<SocialLink> {
        self.0.iter().filter(|link| link.visible).cloned().collect()
    }

    /// First id that appears more than once, if any.
    pub fn duplicate_id(&self) -> Option<&str> {
        let mut seen = HashSet::with_capacity(self.0.len());
        self.0
            .iter()
            .map(|link| link.id.as_str())
            .find(|id| !seen.insert(*id))
    }

    pub fn with_appended(&self, link: SocialLink) -> Self {
        let mut links = self.0.clone();
        links.push(link);
        Self(links)
    }

    pub fn with_replaced(&self, index: usize, link: SocialLink) -> Self {
        assert!(index < self.0.len(), "Replacement index out of bounds");
        let mut links = self.0.clone();
        links[index] = link;
        Self(links)
    }

    pub fn without(&self, index: usize) -> Self {
        assert!(index < self.0.len(), "Removal index out of bounds");
        let mut links = self.0.clone();
        links.remove(index);
        Self(links)
    }

    /// Moves the link at `from` so that it ends up at `to`; `to` is clamped to the last slot.
    pub fn with_moved(&self, from: usize, to: usize) -> Self {
        assert!(from < self.0.len(), "Move source out of bounds");
        let mut links = self.0.clone();
        let link = links.remove(from);
        let target = to.min(links.len());
        links.insert(target, link);
        Self(links)
    }
}

impl Default for LinkCollection {
    fn default() -> Self {
        Self(vec![
            default_link("1", "GITHUB", "https://github.com", "github", "#f0f6fc", true),
            default_link("2", "X / TWITTER", "https://x.com", "twitter", "#1d9bf0", true),
            default_link("3", "LINKEDIN", "https://linkedin.com", "linkedin", "#0a66c2", true),
            default_link("4", "INSTAGRAM", "https://instagram.com", "instagram", "#e1306c", true),
            default_link("5", "YOUTUBE", "https://youtube.com", "youtube", "#ff0000", false),
            default_link("6", "PORTFOLIO", "https://example.com", "globe", "#00f3ff", true),
        ])
    }
}

fn default_link(
    id: &str,
    name: &str,
    url: &str,
    icon: &str,
    color: &str,
    visible: bool,
) -> SocialLink {
    SocialLink {
        id: id.to_string(),
        name: name.to_string(),
        url: url.to_string(),
        icon: icon.to_string(),
        color: color.to_string(),
        visible,
    }
}
