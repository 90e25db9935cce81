//! Level-based access control.
//!
//! Every ([`Resource`], [`Operation`]) pair needs a minimum [`UserLevel`]. Handlers either take a
//! [`RequiresPermission`] extractor, or call [`require_permission`] once they already hold the
//! [`CurrentUser`] (page handlers that also need flash messages).

use std::{marker::PhantomData, ops::Deref};

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    api::models::users::CurrentUser,
    errors::{Error, Result},
    types::{Operation, Resource, UserLevel},
    AppState,
};

/// Minimum level for an operation on a resource
pub fn required_level(resource: Resource, operation: Operation) -> UserLevel {
    match (resource, operation) {
        // Any logged in user can browse
        (_, Operation::Read) => UserLevel::NONE,
        (Resource::Backups, _) | (_, Operation::Backup) => UserLevel::BACKUP_OPERATOR,
        (Resource::Routers, Operation::Manage) => UserLevel::ROUTER_MANAGER,
        (Resource::RouterGroups | Resource::SshKeys | Resource::BackupProfiles, Operation::Manage) => {
            UserLevel::FLEET_MANAGER
        }
    }
}

pub fn has_permission(user: &CurrentUser, resource: Resource, operation: Operation) -> bool {
    user.at_least(required_level(resource, operation))
}

pub fn require_permission(user: &CurrentUser, resource: Resource, operation: Operation) -> Result<()> {
    if has_permission(user, resource, operation) {
        Ok(())
    } else {
        Err(Error::InsufficientPermissions {
            required: required_level(resource, operation),
            action: operation,
            resource,
        })
    }
}

/// Type-level resource markers for [`RequiresPermission`]
pub mod resource {
    use crate::types::Resource;

    macro_rules! markers {
        ($($name:ident),*) => {
            $(
                #[derive(Debug, Default, Clone, Copy)]
                pub struct $name;

                impl From<$name> for Resource {
                    fn from(_: $name) -> Self {
                        Resource::$name
                    }
                }
            )*
        };
    }

    markers!(Routers, RouterGroups, SshKeys, BackupProfiles, Backups);
}

/// Type-level operation markers for [`RequiresPermission`]
pub mod operation {
    use crate::types::Operation;

    macro_rules! markers {
        ($($name:ident),*) => {
            $(
                #[derive(Debug, Default, Clone, Copy)]
                pub struct $name;

                impl From<$name> for Operation {
                    fn from(_: $name) -> Self {
                        Operation::$name
                    }
                }
            )*
        };
    }

    markers!(Read, Manage, Backup);
}

/// Extractor that authenticates the user and checks their level in one step
#[derive(Debug, Clone)]
pub struct RequiresPermission<R, O> {
    user: CurrentUser,
    _marker: PhantomData<(R, O)>,
}

impl<R, O> Deref for RequiresPermission<R, O> {
    type Target = CurrentUser;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl<R, O> FromRequestParts<AppState> for RequiresPermission<R, O>
where
    R: Into<Resource> + Default + Send + Sync,
    O: Into<Operation> + Default + Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        require_permission(&user, R::default().into(), O::default().into())?;

        Ok(Self {
            user,
            _marker: PhantomData,
        })
    }
}
