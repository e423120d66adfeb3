use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::models::profile::{LinkCollection, Profile, SocialLink};
use crate::store::{DocumentStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("link id {0} appears more than once")]
    DuplicateLinkId(String),
    #[error("link {0} not found")]
    UnknownLink(String),
}

/// Link fields an admin supplies; the id is assigned by the editor.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkDraft {
    pub name: String,
    pub url: String,
    pub icon: String,
    pub color: String,
    #[serde(default = "LinkDraft::default_visible")]
    pub visible: bool,
}

impl LinkDraft {
    const fn default_visible() -> bool {
        true
    }

    fn into_link(self, id: String) -> SocialLink {
        SocialLink {
            id,
            name: self.name,
            url: self.url,
            icon: self.icon,
            color: self.color,
            visible: self.visible,
        }
    }
}

/// Admin-only mutation surface over the in-memory documents.
///
/// Every change replaces the whole document and is written through before the
/// in-memory copy is swapped, so memory never runs ahead of storage. Field
/// contents are not validated here.
pub struct Editor<'a> {
    profile: &'a mut Profile,
    links: &'a mut LinkCollection,
    documents: &'a DocumentStore,
}

impl<'a> Editor<'a> {
    pub(crate) fn new(
        profile: &'a mut Profile,
        links: &'a mut LinkCollection,
        documents: &'a DocumentStore,
    ) -> Self {
        Self {
            profile,
            links,
            documents,
        }
    }

    pub fn links(&self) -> &LinkCollection {
        &*self.links
    }

    pub fn update_profile(&mut self, profile: Profile) -> Result<&Profile, EditorError> {
        self.documents.save_profile(&profile)?;
        *self.profile = profile;
        info!("Profile updated by admin");
        Ok(&*self.profile)
    }

    pub fn update_links(&mut self, links: LinkCollection) -> Result<&LinkCollection, EditorError> {
        if let Some(id) = links.duplicate_id() {
            return Err(EditorError::DuplicateLinkId(id.to_string()));
        }
        self.documents.save_links(&links)?;
        *self.links = links;
        info!("Link collection updated by admin ({} links)", self.links.len());
        Ok(&*self.links)
    }

    pub fn add_link(&mut self, draft: LinkDraft) -> Result<SocialLink, EditorError> {
        let link = draft.into_link(self.next_link_id());
        let updated = self.links.with_appended(link.clone());
        self.update_links(updated)?;
        Ok(link)
    }

    pub fn edit_link(&mut self, id: &str, draft: LinkDraft) -> Result<SocialLink, EditorError> {
        let index = self.index_of(id)?;
        let link = draft.into_link(id.to_string());
        let updated = self.links.with_replaced(index, link.clone());
        self.update_links(updated)?;
        Ok(link)
    }

    pub fn remove_link(&mut self, id: &str) -> Result<SocialLink, EditorError> {
        let index = self.index_of(id)?;
        let removed = self.links.as_slice()[index].clone();
        let updated = self.links.without(index);
        self.update_links(updated)?;
        Ok(removed)
    }

    /// Returns the index the link ended up at.
    pub fn move_link(&mut self, id: &str, to: usize) -> Result<usize, EditorError> {
        let from = self.index_of(id)?;
        let updated = self.links.with_moved(from, to);
        self.update_links(updated)?;
        self.index_of(id)
    }

    pub fn set_link_visibility(&mut self, id: &str, visible: bool) -> Result<SocialLink, EditorError> {
        let index = self.index_of(id)?;
        let mut link = self.links.as_slice()[index].clone();
        link.visible = visible;
        let updated = self.links.with_replaced(index, link.clone());
        self.update_links(updated)?;
        Ok(link)
    }

    fn index_of(&self, id: &str) -> Result<usize, EditorError> {
        self.links
            .position(id)
            .ok_or_else(|| EditorError::UnknownLink(id.to_string()))
    }

    fn next_link_id(&self) -> String {
        let mut candidate = Utc::now().timestamp_millis();
        while self.links.get(&candidate.to_string()).is_some() {
            candidate += 1;
        }
        candidate.to_string()
    }
}
