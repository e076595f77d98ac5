//! Module x action permission decisions.
//!
//! # Responsibility
//! - Decide whether an identity may perform an action on a module.
//! - Hold the grant set of the current identity, replaced wholesale on load.
//! - Gate grant writes behind the administrator role.
//!
//! # Invariants
//! - Administrators are allowed everything, with or without grant rows.
//! - A missing grant, or grants loaded for another subject, deny.
//! - Denial is a `false` result, never an error.

use crate::model::grant::{GrantSet, PermissionGrant};
use crate::model::identity::{Identity, IdentityId};
use crate::model::module::{ModuleKey, ModuleNamespace, PermissionAction};
use crate::repo::grant_repo::{GrantRepository, RepoError};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// The decision procedure on its own, over an explicit grant set.
pub fn check(
    identity: &Identity,
    grants: &GrantSet,
    module: ModuleKey,
    action: PermissionAction,
) -> bool {
    identity.is_administrator() || grants.allows(module, action)
}

#[derive(Debug)]
struct LoadedGrants {
    subject_id: IdentityId,
    grants: GrantSet,
}

/// Permission engine bound to one grant repository.
pub struct PermissionEngine<R: GrantRepository> {
    repo: R,
    loaded: Option<LoadedGrants>,
}

impl<R: GrantRepository> PermissionEngine<R> {
    pub fn new(repo: R) -> Self {
        Self { repo, loaded: None }
    }

    /// Fetches `identity`'s grants and replaces whatever was loaded before.
    pub fn load_for(&mut self, identity: &Identity) -> Result<&GrantSet, PermissionError> {
        let grants = self.grants_for(&identity.id)?;
        debug!(
            "event=grants_load module=permission status=ok count={}",
            grants.len()
        );
        let loaded = self.loaded.insert(LoadedGrants {
            subject_id: identity.id.clone(),
            grants,
        });
        Ok(&loaded.grants)
    }

    /// Drops the loaded grant set, e.g. on sign-out.
    pub fn clear(&mut self) {
        self.loaded = None;
    }

    pub fn loaded_subject(&self) -> Option<&str> {
        self.loaded.as_ref().map(|loaded| loaded.subject_id.as_str())
    }

    pub fn loaded_grants(&self) -> Option<&GrantSet> {
        self.loaded.as_ref().map(|loaded| &loaded.grants)
    }

    /// Whether `identity` may perform `action` on `module`.
    pub fn can(
        &self,
        identity: &Identity,
        module: impl Into<ModuleKey>,
        action: PermissionAction,
    ) -> bool {
        let module = module.into();
        if identity.is_administrator() {
            return true;
        }
        match &self.loaded {
            Some(loaded) if loaded.subject_id == identity.id => {
                check(identity, &loaded.grants, module, action)
            }
            _ => false,
        }
    }

    /// Reads the stored grants of any subject without loading them.
    pub fn grants_for(&self, subject_id: &str) -> Result<GrantSet, PermissionError> {
        let grants = self.repo.list_grants(subject_id)?;
        Ok(GrantSet::from_grants(&grants))
    }

    /// Replaces `subject_id`'s grants in `namespace` with exactly `grants`.
    ///
    /// # Errors
    /// - [`PermissionError::AdministratorRequired`] when `actor` is not an
    ///   administrator; nothing is written.
    /// - [`PermissionError::ModuleOutsideNamespace`] or
    ///   [`PermissionError::DuplicateModule`] for malformed sets.
    /// - [`PermissionError::Repo`] when persistence fails; the previous set
    ///   stays in place.
    ///
    /// When `subject_id` is the loaded subject and re-reading its grants
    /// fails after a committed write, the loaded set is cleared.
    pub fn save_grants(
        &mut self,
        actor: &Identity,
        subject_id: &str,
        namespace: ModuleNamespace,
        grants: &[PermissionGrant],
    ) -> Result<(), PermissionError> {
        if !actor.is_administrator() {
            warn!(
                "event=grants_save module=permission status=denied namespace={}",
                namespace.as_str()
            );
            return Err(PermissionError::AdministratorRequired);
        }

        let mut seen = BTreeSet::new();
        for grant in grants {
            if grant.module.namespace() != namespace {
                return Err(PermissionError::ModuleOutsideNamespace {
                    module: grant.module,
                    namespace,
                });
            }
            if !seen.insert(grant.module) {
                return Err(PermissionError::DuplicateModule(grant.module));
            }
        }

        self.repo.replace_grants(subject_id, namespace, grants)?;
        info!(
            "event=grants_save module=permission status=ok namespace={} count={}",
            namespace.as_str(),
            grants.len()
        );

        if self.loaded_subject() == Some(subject_id) {
            match self.grants_for(subject_id) {
                Ok(grants) => {
                    if let Some(loaded) = self.loaded.as_mut() {
                        loaded.grants = grants;
                    }
                }
                Err(err) => {
                    warn!(
                        "event=grants_reload module=permission status=cleared error={err}"
                    );
                    self.clear();
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum PermissionError {
    AdministratorRequired,
    ModuleOutsideNamespace {
        module: ModuleKey,
        namespace: ModuleNamespace,
    },
    DuplicateModule(ModuleKey),
    Repo(RepoError),
}

impl Display for PermissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AdministratorRequired => {
                write!(f, "only administrators can change permissions")
            }
            Self::ModuleOutsideNamespace { module, namespace } => write!(
                f,
                "module `{module}` does not belong to the {} namespace",
                namespace.as_str()
            ),
            Self::DuplicateModule(module) => {
                write!(f, "module `{module}` appears more than once")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PermissionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PermissionError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}
