//! Query strings and the edit form for routers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::models::forms::{optional_choices, optional_text, required_name, FieldErrors, FieldView, FormData, SelectOption},
    db::models::{
        backup_profiles::BackupProfileDBResponse,
        routers::{RouterCreateDBRequest, RouterDBResponse, RouterType, RouterUpdateDBRequest},
        ssh_keys::SshKeyDBResponse,
    },
    errors::Error,
    types::RouterId,
};

/// Parse an optional `uuid` parameter. Empty means absent, malformed means "not found".
fn parse_id(raw: Option<&str>, resource: &str) -> Result<Option<Uuid>, Error> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => Uuid::parse_str(raw).map(Some).map_err(|_| Error::NotFound {
            resource: resource.to_string(),
            id: raw.to_string(),
        }),
    }
}

/// `?uuid=` on detail pages
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UuidQuery {
    pub uuid: Option<String>,
}

impl UuidQuery {
    /// The id, which must be present
    pub fn required_id(&self, resource: &str) -> Result<Uuid, Error> {
        parse_id(self.uuid.as_deref(), resource)?.ok_or_else(|| Error::NotFound {
            resource: resource.to_string(),
            id: String::new(),
        })
    }
}

/// Query string of every manage page: `?uuid=&action=delete&confirmation=delete`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManageQuery {
    pub uuid: Option<String>,
    pub action: Option<String>,
    pub confirmation: Option<String>,
}

impl ManageQuery {
    /// The entity being edited, `None` when creating
    pub fn id(&self, resource: &str) -> Result<Option<Uuid>, Error> {
        parse_id(self.uuid.as_deref(), resource)
    }

    pub fn wants_delete(&self) -> bool {
        self.action.as_deref() == Some("delete")
    }

    pub fn delete_confirmed(&self) -> bool {
        self.confirmation.as_deref() == Some("delete")
    }
}

/// `?filter_group=` on the router list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouterListQuery {
    pub filter_group: Option<String>,
}

/// How the router list is narrowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupFilter {
    /// Every router, with the default group preselected in the picker
    Unset,
    /// Every router, nothing preselected
    All,
    Group(Uuid),
}

impl RouterListQuery {
    pub fn group_filter(&self) -> Result<GroupFilter, Error> {
        match self.filter_group.as_deref().map(str::trim) {
            None | Some("") => Ok(GroupFilter::Unset),
            Some("all") => Ok(GroupFilter::All),
            Some(raw) => Uuid::parse_str(raw).map(GroupFilter::Group).map_err(|_| Error::NotFound {
                resource: "Router group".to_string(),
                id: raw.to_string(),
            }),
        }
    }
}

/// Router row with the names the list page shows
#[derive(Debug, Clone, Serialize)]
pub struct RouterListItem {
    #[serde(flatten)]
    pub router: RouterDBResponse,
    pub router_type_label: &'static str,
    pub status_online: Option<bool>,
    pub backup_lock: bool,
    pub backup_profile_name: Option<String>,
}

/// Submitted (or loaded) router form values, kept as text for re-rendering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterForm {
    pub name: String,
    pub address: String,
    pub username: String,
    pub password: String,
    pub ssh_key: String,
    pub router_type: String,
    pub monitoring: bool,
    pub enabled: bool,
    pub backup_profile: String,
}

/// Validated router values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterValues {
    pub name: String,
    pub address: String,
    pub username: String,
    /// `None` keeps the stored password on edit
    pub password: Option<String>,
    pub ssh_key_id: Option<Uuid>,
    pub router_type: RouterType,
    pub monitoring: bool,
    pub enabled: bool,
    pub backup_profile_id: Option<Uuid>,
}

impl From<RouterValues> for RouterCreateDBRequest {
    fn from(v: RouterValues) -> Self {
        Self {
            name: v.name,
            address: v.address,
            username: v.username,
            password: v.password,
            ssh_key_id: v.ssh_key_id,
            router_type: v.router_type,
            monitoring: v.monitoring,
            enabled: v.enabled,
            backup_profile_id: v.backup_profile_id,
        }
    }
}

impl From<RouterValues> for RouterUpdateDBRequest {
    fn from(v: RouterValues) -> Self {
        Self {
            name: v.name,
            address: v.address,
            username: v.username,
            password: v.password,
            ssh_key_id: v.ssh_key_id,
            router_type: v.router_type,
            monitoring: v.monitoring,
            enabled: v.enabled,
            backup_profile_id: v.backup_profile_id,
        }
    }
}

impl From<&RouterDBResponse> for RouterForm {
    fn from(router: &RouterDBResponse) -> Self {
        Self {
            name: router.name.clone(),
            address: router.address.clone(),
            username: router.username.clone(),
            password: String::new(),
            ssh_key: router.ssh_key_id.map(|id| id.to_string()).unwrap_or_default(),
            router_type: router.router_type.as_str().to_string(),
            monitoring: router.monitoring,
            enabled: router.enabled,
            backup_profile: router.backup_profile_id.map(|id| id.to_string()).unwrap_or_default(),
        }
    }
}

/// Choices for the select inputs
pub struct RouterChoices<'a> {
    pub ssh_keys: &'a [SshKeyDBResponse],
    pub backup_profiles: &'a [BackupProfileDBResponse],
}

impl RouterChoices<'_> {
    fn resolve(&self, raw: &str, field: &str, known: impl Fn(Uuid) -> bool, errors: &mut FieldErrors) -> Option<Uuid> {
        if raw.is_empty() {
            return None;
        }
        match Uuid::parse_str(raw) {
            Ok(id) if known(id) => Some(id),
            _ => {
                errors.add(field, "Select a valid choice. That choice is not one of the available choices.");
                None
            }
        }
    }
}

impl RouterForm {
    /// New routers start enabled and monitored
    pub fn blank() -> Self {
        Self {
            router_type: RouterType::RouterOs.as_str().to_string(),
            monitoring: true,
            enabled: true,
            ..Default::default()
        }
    }

    pub fn from_form(form: &FormData) -> Self {
        Self {
            name: form.text("name"),
            address: form.text("address"),
            username: form.text("username"),
            // Passwords may legitimately start or end with spaces
            password: form.get("password").unwrap_or_default().to_string(),
            ssh_key: form.text("ssh_key"),
            router_type: form.text("router_type"),
            monitoring: form.checkbox("monitoring"),
            enabled: form.checkbox("enabled"),
            backup_profile: form.text("backup_profile"),
        }
    }

    /// Validate against the available choices. `existing` is the router being edited.
    pub fn validate(
        &self,
        choices: &RouterChoices<'_>,
        existing: Option<&RouterDBResponse>,
    ) -> Result<RouterValues, FieldErrors> {
        let mut errors = FieldErrors::default();

        let name = required_name(&self.name, "name", &mut errors);
        let address = required_name(&self.address, "address", &mut errors);
        if address.chars().any(char::is_whitespace) {
            errors.add("address", "Enter a valid hostname or IP address.");
        }

        let router_type = match self.router_type.parse::<RouterType>() {
            Ok(t) => t,
            Err(_) => {
                errors.add("router_type", "Select a valid choice.");
                RouterType::Monitoring
            }
        };

        let ssh_key_id = choices.resolve(
            &self.ssh_key,
            "ssh_key",
            |id| choices.ssh_keys.iter().any(|k| k.id == id),
            &mut errors,
        );
        let backup_profile_id = choices.resolve(
            &self.backup_profile,
            "backup_profile",
            |id| choices.backup_profiles.iter().any(|p| p.id == id),
            &mut errors,
        );

        let password = optional_text(self.password.clone());

        if router_type != RouterType::Monitoring {
            if self.username.is_empty() {
                errors.add("username", "This field is required.");
            }
            let has_stored_password = existing.is_some_and(|r| r.password.as_deref().is_some_and(|p| !p.is_empty()));
            if password.is_none() && ssh_key_id.is_none() && !has_stored_password {
                errors.add("password", "You must provide a password or an SSH key.");
            }
        } else if backup_profile_id.is_some() {
            errors.add("backup_profile", "Monitoring only routers cannot have a backup profile.");
        }

        errors.into_result(RouterValues {
            name,
            address,
            username: self.username.clone(),
            password,
            ssh_key_id,
            router_type,
            monitoring: self.monitoring,
            enabled: self.enabled,
            backup_profile_id,
        })
    }

    pub fn fields(&self, choices: &RouterChoices<'_>, errors: &FieldErrors) -> Vec<FieldView> {
        let router_types = RouterType::ALL
            .iter()
            .map(|t| SelectOption::new(t.as_str(), t.label(), self.router_type == t.as_str()))
            .collect();
        let ssh_keys = optional_choices(
            choices.ssh_keys.iter().map(|k| (k.id.to_string(), k.name.clone())),
            Some(self.ssh_key.as_str()),
        );
        let profiles = optional_choices(
            choices.backup_profiles.iter().map(|p| (p.id.to_string(), p.name.clone())),
            Some(self.backup_profile.as_str()),
        );

        vec![
            FieldView::text("name", "Name", &self.name).required(),
            FieldView::text("address", "Address", &self.address)
                .required()
                .help("Hostname or IP address"),
            FieldView::select("router_type", "Router type", router_types).required(),
            FieldView::text("username", "Username", &self.username),
            FieldView::password("password", "Password").help("Leave empty to keep the current password"),
            FieldView::select("ssh_key", "SSH key", ssh_keys),
            FieldView::select("backup_profile", "Backup profile", profiles),
            FieldView::checkbox("monitoring", "Monitoring", self.monitoring),
            FieldView::checkbox("enabled", "Enabled", self.enabled),
        ]
        .into_iter()
        .map(|field| field.with_errors(errors))
        .collect()
    }
}

/// One line of the bulk backup response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkBackupResult {
    pub router: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkBackupResponse {
    pub results: Vec<BulkBackupResult>,
}

/// Router details page, where backup actions return to
pub fn details_url(id: RouterId) -> String {
    format!("/router/details/?uuid={id}")
}
