//! SSH key list and manage pages. Private keys are write-only.

use axum::{
    extract::{Query, State},
    http::Method,
    response::{IntoResponse, Response},
};
use minijinja::context;
use tracing::{info, instrument};

use crate::{
    api::{
        handlers::{render_form, FormPage},
        models::{
            forms::{FieldErrors, FormData},
            routers::ManageQuery,
            ssh_keys::SshKeyForm,
        },
    },
    auth::permissions::{has_permission, require_permission},
    db::{
        errors::DbError,
        handlers::{Repository, SshKeys},
    },
    errors::{Error, Result},
    flash::FlashLevel,
    templates::Page,
    types::{Operation, Resource},
    AppState,
};

pub const SSH_KEY_LIST_PATH: &str = "/router/ssh_keys/list/";

#[instrument(skip_all)]
pub async fn ssh_key_list(State(state): State<AppState>, page: Page) -> Result<Response> {
    let mut conn = state.db.acquire().await.map_err(DbError::from)?;
    let keys = SshKeys::new(&mut conn).list(&()).await?;

    let can_manage = has_permission(&page.user, Resource::SshKeys, Operation::Manage);
    page.render(
        "sshkey_list.html",
        context! {
            page_title => "SSH Key List",
            sshkey_list => keys,
            can_manage => can_manage,
        },
    )
}

#[instrument(skip_all)]
pub async fn manage_ssh_key(
    State(state): State<AppState>,
    Query(query): Query<ManageQuery>,
    method: Method,
    page: Page,
    form: FormData,
) -> Result<Response> {
    require_permission(&page.user, Resource::SshKeys, Operation::Manage)?;
    let id = query.id("SSH key")?;

    let mut tx = state.db.begin().await.map_err(DbError::from)?;
    let existing = match id {
        Some(id) => Some(SshKeys::new(&mut tx).get_by_id(id).await?.ok_or_else(|| Error::NotFound {
            resource: "SSH key".to_string(),
            id: id.to_string(),
        })?),
        None => None,
    };

    if let Some(key) = existing.as_ref().filter(|_| query.wants_delete()) {
        if !query.delete_confirmed() {
            return Ok(page
                .message(FlashLevel::Warning, "SSH Key not deleted|Invalid confirmation")
                .redirect(SSH_KEY_LIST_PATH)
                .into_response());
        }

        SshKeys::new(&mut tx).delete(key.id).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(key = %key.name, "SSH key deleted");
        return Ok(page
            .message(FlashLevel::Success, "SSH Key deleted successfully")
            .redirect(SSH_KEY_LIST_PATH)
            .into_response());
    }

    let creating = existing.is_none();
    let form_page = FormPage {
        title: "Manage SSH Key",
        instance: id,
        list_url: SSH_KEY_LIST_PATH,
        deletable: true,
    };

    if method != Method::POST {
        let key_form = existing.as_ref().map(SshKeyForm::from).unwrap_or_default();
        let fields = key_form.fields(creating, &FieldErrors::default());
        return render_form(page, form_page, fields, &FieldErrors::default());
    }

    let key_form = SshKeyForm::from_form(&form);
    let values = match key_form.validate(creating) {
        Ok(values) => values,
        Err(errors) => {
            let fields = key_form.fields(creating, &errors);
            return render_form(page, form_page, fields, &errors);
        }
    };

    let saved = match id {
        Some(id) => SshKeys::new(&mut tx).update(id, &values.into()).await,
        None => {
            let request = values.into_create().ok_or_else(|| Error::BadRequest {
                message: "A private key is required".to_string(),
            })?;
            SshKeys::new(&mut tx).create(&request).await
        }
    };
    let key = match saved {
        Ok(key) => key,
        Err(e) if e.is_unique_violation_on_column("ssh_keys", "name") => {
            let mut errors = FieldErrors::default();
            errors.add("name", "SSH key with this Name already exists.");
            let fields = key_form.fields(creating, &errors);
            return render_form(page, form_page, fields, &errors);
        }
        Err(e) => return Err(e.into()),
    };
    tx.commit().await.map_err(DbError::from)?;

    info!(key = %key.name, "SSH key saved");
    Ok(page
        .message(FlashLevel::Success, "SSH Key saved successfully")
        .redirect(SSH_KEY_LIST_PATH)
        .into_response())
}
