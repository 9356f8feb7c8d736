//! Signing identity and provisioning profile lookup
//!
//! Candidates are enumerated by an external catalog; selection by name
//! fails fast when nothing matches, naming the candidates that were
//! searched.

use serde::{Deserialize, Serialize};

/// Signing errors
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("no signing identity matches '{name}' (candidates: {})", candidates.join(", "))]
    IdentityNotFound {
        name: String,
        candidates: Vec<String>,
    },

    #[error("no provisioning profile matches '{name}' (candidates: {})", candidates.join(", "))]
    ProfileNotFound {
        name: String,
        candidates: Vec<String>,
    },
}

/// A code-signing identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningIdentity {
    /// Human-readable name (e.g., "iPhone Developer: J Appleseed")
    pub name: String,

    /// Certificate fingerprint
    pub fingerprint: String,
}

/// A provisioning profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningProfile {
    /// Profile name
    pub name: String,

    /// Profile UUID
    pub uuid: String,
}

/// Enumerates the signing candidates available on this host
pub trait SigningCatalog {
    fn identities(&self) -> Vec<SigningIdentity>;
    fn profiles(&self) -> Vec<ProvisioningProfile>;
}

/// Catalog over a fixed candidate list (host integrations populate it
/// from their own enumeration)
#[derive(Debug, Clone, Default)]
pub struct StaticSigningCatalog {
    pub identities: Vec<SigningIdentity>,
    pub profiles: Vec<ProvisioningProfile>,
}

impl SigningCatalog for StaticSigningCatalog {
    fn identities(&self) -> Vec<SigningIdentity> {
        self.identities.clone()
    }

    fn profiles(&self) -> Vec<ProvisioningProfile> {
        self.profiles.clone()
    }
}

/// Find a signing identity by name. An exact name match wins; a
/// fingerprint prefix is accepted as a fallback key.
pub fn find_identity(
    candidates: &[SigningIdentity],
    name: &str,
) -> Result<SigningIdentity, SigningError> {
    candidates
        .iter()
        .find(|c| c.name == name)
        .or_else(|| {
            candidates
                .iter()
                .find(|c| c.fingerprint.starts_with(&name.to_uppercase()))
        })
        .cloned()
        .ok_or_else(|| SigningError::IdentityNotFound {
            name: name.to_string(),
            candidates: candidates.iter().map(|c| c.name.clone()).collect(),
        })
}

/// Find a provisioning profile by name, with the UUID as a fallback key.
pub fn find_profile(
    candidates: &[ProvisioningProfile],
    name: &str,
) -> Result<ProvisioningProfile, SigningError> {
    candidates
        .iter()
        .find(|c| c.name == name)
        .or_else(|| candidates.iter().find(|c| c.uuid == name))
        .cloned()
        .ok_or_else(|| SigningError::ProfileNotFound {
            name: name.to_string(),
            candidates: candidates.iter().map(|c| c.name.clone()).collect(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identities() -> Vec<SigningIdentity> {
        vec![
            SigningIdentity {
                name: "iPhone Developer: A".to_string(),
                fingerprint: "AA11BB22".to_string(),
            },
            SigningIdentity {
                name: "iPhone Distribution: B".to_string(),
                fingerprint: "CC33DD44".to_string(),
            },
        ]
    }

    #[test]
    fn test_find_identity_by_name() {
        let found = find_identity(&identities(), "iPhone Developer: A").unwrap();
        assert_eq!(found.fingerprint, "AA11BB22");
    }

    #[test]
    fn test_find_identity_by_fingerprint_prefix() {
        let found = find_identity(&identities(), "cc33").unwrap();
        assert_eq!(found.name, "iPhone Distribution: B");
    }

    #[test]
    fn test_identity_not_found_names_candidates() {
        let err = find_identity(&identities(), "Nobody").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Nobody"));
        assert!(message.contains("iPhone Developer: A"));
    }

    #[test]
    fn test_find_profile_by_uuid() {
        let profiles = vec![ProvisioningProfile {
            name: "Wildcard".to_string(),
            uuid: "0000-1111".to_string(),
        }];
        assert_eq!(find_profile(&profiles, "0000-1111").unwrap().name, "Wildcard");
        assert!(find_profile(&profiles, "2222").is_err());
    }
}
