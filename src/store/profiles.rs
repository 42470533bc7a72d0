use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{StoreError, backend::Document};
use crate::domain::profiles::{Profile, validate_profile_name};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredProfiles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
    pub profiles: BTreeMap<String, Profile>,
}

#[derive(Debug)]
pub struct ProfileStore {
    doc: Document<StoredProfiles>,
}

impl ProfileStore {
    pub(crate) fn new(doc: Document<StoredProfiles>) -> Self {
        Self { doc }
    }

    pub fn location(&self) -> String {
        self.doc.describe()
    }

    /// Profiles sorted by name.
    pub fn list(&self) -> Result<Vec<Profile>, StoreError> {
        Ok(self.doc.load()?.profiles.into_values().collect())
    }

    pub fn get(&self, name: &str) -> Result<Profile, StoreError> {
        self.doc
            .load()?
            .profiles
            .remove(name)
            .ok_or_else(|| not_found(name))
    }

    pub fn add(&self, profile: Profile, replace: bool) -> Result<(), StoreError> {
        validate_profile_name(&profile.name)?;
        self.doc.update(|stored| {
            if !replace && stored.profiles.contains_key(&profile.name) {
                return Err(StoreError::AlreadyExists {
                    kind: "profile",
                    name: profile.name.clone(),
                });
            }
            stored.profiles.insert(profile.name.clone(), profile);
            Ok(())
        })
    }

    /// Removing the active profile clears the active pointer. Callers go
    /// through [`Store::remove_profile`](super::Store::remove_profile), which
    /// also drops the copied credentials.
    pub(crate) fn remove(&self, name: &str) -> Result<Profile, StoreError> {
        self.doc.update(|stored| {
            let removed = stored.profiles.remove(name).ok_or_else(|| not_found(name))?;
            if stored.active.as_deref() == Some(name) {
                stored.active = None;
            }
            Ok(removed)
        })
    }

    pub fn active_name(&self) -> Result<Option<String>, StoreError> {
        Ok(self.doc.load()?.active)
    }

    /// The active profile; a pointer to a profile that no longer exists reads
    /// as no active profile.
    pub fn active(&self) -> Result<Option<Profile>, StoreError> {
        let mut stored = self.doc.load()?;
        Ok(stored
            .active
            .take()
            .and_then(|name| stored.profiles.remove(&name)))
    }

    /// Forget which profile is active; the profiles themselves stay.
    pub fn clear_active(&self) -> Result<Option<String>, StoreError> {
        self.doc.update(|stored| Ok(stored.active.take()))
    }

    pub(crate) fn set_active(&self, name: &str) -> Result<Profile, StoreError> {
        self.doc.update(|stored| {
            let profile = stored
                .profiles
                .get(name)
                .cloned()
                .ok_or_else(|| not_found(name))?;
            stored.active = Some(name.to_string());
            Ok(profile)
        })
    }
}

fn not_found(name: &str) -> StoreError {
    StoreError::NotFound {
        kind: "profile",
        name: name.to_string(),
    }
}
