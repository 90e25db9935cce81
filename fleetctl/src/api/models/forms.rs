//! HTML form plumbing shared by the manage pages.
//!
//! Bodies are `application/x-www-form-urlencoded` and may repeat keys (multi-selects), so they are
//! kept as ordered pairs instead of going through `axum::Form`. Each entity form turns a
//! [`FormData`] into typed values or a set of [`FieldErrors`], and describes itself as a list of
//! [`FieldView`]s that `generic_form.html` renders.

use std::collections::BTreeMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::Serialize;

use crate::errors::Error;

/// Longest name accepted for any entity
pub const MAX_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn parse(body: &[u8]) -> Self {
        Self {
            pairs: url::form_urlencoded::parse(body).into_owned().collect(),
        }
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Trimmed value for `key`, empty when missing
    pub fn text(&self, key: &str) -> String {
        self.get(key).map(|v| v.trim().to_string()).unwrap_or_default()
    }

    /// Every value for `key`, in submission order
    pub fn all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// HTML checkboxes are only submitted when ticked
    pub fn checkbox(&self, key: &str) -> bool {
        matches!(self.get(key), Some(v) if !matches!(v, "" | "0" | "false" | "off"))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<S: Send + Sync> FromRequest<S> for FormData {
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|e| Error::BadRequest {
            message: format!("Could not read form body: {e}"),
        })?;
        Ok(Self::parse(&body))
    }
}

/// Validation errors keyed by field name. `__all__` holds errors not tied to a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub const NON_FIELD: &'static str = "__all__";

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(value)` when nothing was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Required, trimmed, at most [`MAX_NAME_LENGTH`] characters
pub fn required_name(value: &str, field: &str, errors: &mut FieldErrors) -> String {
    if value.is_empty() {
        errors.add(field, "This field is required.");
    } else if value.chars().count() > MAX_NAME_LENGTH {
        errors.add(
            field,
            format!("Ensure this value has at most {MAX_NAME_LENGTH} characters."),
        );
    }
    value.to_string()
}

/// Integer in `min..=max`
pub fn bounded_int(value: &str, field: &str, min: i32, max: i32, errors: &mut FieldErrors) -> i32 {
    match value.parse::<i32>() {
        Ok(n) if (min..=max).contains(&n) => n,
        Ok(_) => {
            errors.add(field, format!("Enter a whole number between {min} and {max}."));
            min
        }
        Err(_) => {
            errors.add(field, "Enter a whole number.");
            min
        }
    }
}

/// Empty maps to `None`
pub fn optional_text(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Password,
    Textarea,
    Checkbox,
    Number,
    Time,
    Select,
    Multiselect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected,
        }
    }
}

/// One rendered form input
#[derive(Debug, Clone, Serialize)]
pub struct FieldView {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub value: String,
    pub checked: bool,
    pub required: bool,
    pub help: Option<&'static str>,
    pub options: Vec<SelectOption>,
    pub errors: Vec<String>,
}

impl FieldView {
    fn new(kind: FieldKind, name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            kind,
            value: String::new(),
            checked: false,
            required: false,
            help: None,
            options: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn text(name: &'static str, label: &'static str, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::new(FieldKind::Text, name, label)
        }
    }

    /// Password inputs are never pre-filled
    pub fn password(name: &'static str, label: &'static str) -> Self {
        Self::new(FieldKind::Password, name, label)
    }

    pub fn textarea(name: &'static str, label: &'static str, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::new(FieldKind::Textarea, name, label)
        }
    }

    pub fn checkbox(name: &'static str, label: &'static str, checked: bool) -> Self {
        Self {
            checked,
            ..Self::new(FieldKind::Checkbox, name, label)
        }
    }

    pub fn number(name: &'static str, label: &'static str, value: impl ToString) -> Self {
        Self {
            value: value.to_string(),
            ..Self::new(FieldKind::Number, name, label)
        }
    }

    pub fn time(name: &'static str, label: &'static str, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::new(FieldKind::Time, name, label)
        }
    }

    pub fn select(name: &'static str, label: &'static str, options: Vec<SelectOption>) -> Self {
        Self {
            options,
            ..Self::new(FieldKind::Select, name, label)
        }
    }

    pub fn multiselect(name: &'static str, label: &'static str, options: Vec<SelectOption>) -> Self {
        Self {
            options,
            ..Self::new(FieldKind::Multiselect, name, label)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }

    /// Attach any errors recorded for this field
    pub fn with_errors(mut self, errors: &FieldErrors) -> Self {
        self.errors = errors.get(self.name).to_vec();
        self
    }
}

/// Selects with an empty "---------" choice first
pub fn optional_choices<I>(items: I, selected: Option<&str>) -> Vec<SelectOption>
where
    I: IntoIterator<Item = (String, String)>,
{
    std::iter::once(SelectOption::new("", "---------", selected.is_none_or(str::is_empty)))
        .chain(
            items
                .into_iter()
                .map(|(value, label)| {
                    let is_selected = selected == Some(value.as_str());
                    SelectOption::new(value, label, is_selected)
                }),
        )
        .collect()
}
