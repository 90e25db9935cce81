//! Edit form for router groups.

use serde::Serialize;
use uuid::Uuid;

use crate::{
    api::models::forms::{optional_text, required_name, FieldErrors, FieldView, FormData, SelectOption},
    db::models::{
        router_groups::{RouterGroupCreateDBRequest, RouterGroupDBResponse, RouterGroupUpdateDBRequest},
        routers::RouterDBResponse,
    },
};

/// Group row on the list page
#[derive(Debug, Clone, Serialize)]
pub struct RouterGroupListItem {
    #[serde(flatten)]
    pub group: RouterGroupDBResponse,
    pub router_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterGroupForm {
    pub name: String,
    pub default_group: bool,
    pub internal_notes: String,
    pub routers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterGroupValues {
    pub name: String,
    pub default_group: bool,
    pub internal_notes: Option<String>,
    pub router_ids: Vec<Uuid>,
}

impl From<RouterGroupValues> for RouterGroupCreateDBRequest {
    fn from(v: RouterGroupValues) -> Self {
        Self {
            name: v.name,
            default_group: v.default_group,
            internal_notes: v.internal_notes,
            router_ids: v.router_ids,
        }
    }
}

impl From<RouterGroupValues> for RouterGroupUpdateDBRequest {
    fn from(v: RouterGroupValues) -> Self {
        Self {
            name: v.name,
            default_group: v.default_group,
            internal_notes: v.internal_notes,
            router_ids: v.router_ids,
        }
    }
}

impl From<&RouterGroupDBResponse> for RouterGroupForm {
    fn from(group: &RouterGroupDBResponse) -> Self {
        Self {
            name: group.name.clone(),
            default_group: group.default_group,
            internal_notes: group.internal_notes.clone().unwrap_or_default(),
            routers: group.router_ids.iter().map(Uuid::to_string).collect(),
        }
    }
}

impl RouterGroupForm {
    pub fn from_form(form: &FormData) -> Self {
        Self {
            name: form.text("name"),
            default_group: form.checkbox("default_group"),
            internal_notes: form.text("internal_notes"),
            routers: form
                .all("routers")
                .into_iter()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn validate(&self, routers: &[RouterDBResponse]) -> Result<RouterGroupValues, FieldErrors> {
        let mut errors = FieldErrors::default();
        let name = required_name(&self.name, "name", &mut errors);

        let mut router_ids = Vec::with_capacity(self.routers.len());
        for raw in &self.routers {
            match Uuid::parse_str(raw) {
                Ok(id) if routers.iter().any(|r| r.id == id) => {
                    if !router_ids.contains(&id) {
                        router_ids.push(id);
                    }
                }
                _ => errors.add("routers", format!("Select a valid choice. {raw} is not one of the available choices.")),
            }
        }

        errors.into_result(RouterGroupValues {
            name,
            default_group: self.default_group,
            internal_notes: optional_text(self.internal_notes.clone()),
            router_ids,
        })
    }

    pub fn fields(&self, routers: &[RouterDBResponse], errors: &FieldErrors) -> Vec<FieldView> {
        let options = routers
            .iter()
            .map(|r| {
                let id = r.id.to_string();
                let selected = self.routers.contains(&id);
                SelectOption::new(id, r.name.clone(), selected)
            })
            .collect();

        vec![
            FieldView::text("name", "Name", &self.name).required(),
            FieldView::checkbox("default_group", "Default group", self.default_group)
                .help("Preselected on the router list. Only one group can be the default."),
            FieldView::multiselect("routers", "Routers", options),
            FieldView::textarea("internal_notes", "Internal notes", &self.internal_notes),
        ]
        .into_iter()
        .map(|field| field.with_errors(errors))
        .collect()
    }
}
