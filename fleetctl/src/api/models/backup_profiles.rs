//! Edit form for backup profiles.

use chrono::NaiveTime;

use crate::{
    api::models::forms::{bounded_int, required_name, FieldErrors, FieldView, FormData, SelectOption},
    db::models::backup_profiles::{BackupProfileDBResponse, BackupProfileFields, WeekDay},
};

/// Retention limits in days
const MAX_RETENTION_DAYS: i32 = 3650;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupProfileForm {
    pub name: String,
    pub daily_backup: bool,
    pub weekly_backup: bool,
    pub monthly_backup: bool,
    pub daily_retention: String,
    pub weekly_retention: String,
    pub monthly_retention: String,
    pub instant_retention: String,
    pub weekly_day: String,
    pub monthly_day: String,
    pub backup_time: String,
}

impl From<&BackupProfileFields> for BackupProfileForm {
    fn from(f: &BackupProfileFields) -> Self {
        Self {
            name: f.name.clone(),
            daily_backup: f.daily_backup,
            weekly_backup: f.weekly_backup,
            monthly_backup: f.monthly_backup,
            daily_retention: f.daily_retention.to_string(),
            weekly_retention: f.weekly_retention.to_string(),
            monthly_retention: f.monthly_retention.to_string(),
            instant_retention: f.instant_retention.to_string(),
            weekly_day: f.weekly_day.as_str().to_string(),
            monthly_day: f.monthly_day.to_string(),
            backup_time: f.backup_time.format("%H:%M").to_string(),
        }
    }
}

impl From<&BackupProfileDBResponse> for BackupProfileForm {
    fn from(p: &BackupProfileDBResponse) -> Self {
        Self::from(&BackupProfileFields {
            name: p.name.clone(),
            daily_backup: p.daily_backup,
            weekly_backup: p.weekly_backup,
            monthly_backup: p.monthly_backup,
            daily_retention: p.daily_retention,
            weekly_retention: p.weekly_retention,
            monthly_retention: p.monthly_retention,
            instant_retention: p.instant_retention,
            weekly_day: p.weekly_day,
            monthly_day: p.monthly_day,
            backup_time: p.backup_time,
        })
    }
}

impl Default for BackupProfileForm {
    fn default() -> Self {
        Self::from(&BackupProfileFields::default())
    }
}

/// Accepts `HH:MM` (browser time inputs) and `HH:MM:SS`
fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

impl BackupProfileForm {
    pub fn from_form(form: &FormData) -> Self {
        Self {
            name: form.text("name"),
            daily_backup: form.checkbox("daily_backup"),
            weekly_backup: form.checkbox("weekly_backup"),
            monthly_backup: form.checkbox("monthly_backup"),
            daily_retention: form.text("daily_retention"),
            weekly_retention: form.text("weekly_retention"),
            monthly_retention: form.text("monthly_retention"),
            instant_retention: form.text("instant_retention"),
            weekly_day: form.text("weekly_day"),
            monthly_day: form.text("monthly_day"),
            backup_time: form.text("backup_time"),
        }
    }

    pub fn validate(&self) -> Result<BackupProfileFields, FieldErrors> {
        let mut errors = FieldErrors::default();
        let name = required_name(&self.name, "name", &mut errors);

        let retention =
            |value: &str, field: &str, errors: &mut FieldErrors| bounded_int(value, field, 1, MAX_RETENTION_DAYS, errors);
        let daily_retention = retention(&self.daily_retention, "daily_retention", &mut errors);
        let weekly_retention = retention(&self.weekly_retention, "weekly_retention", &mut errors);
        let monthly_retention = retention(&self.monthly_retention, "monthly_retention", &mut errors);
        let instant_retention = retention(&self.instant_retention, "instant_retention", &mut errors);
        let monthly_day = bounded_int(&self.monthly_day, "monthly_day", 1, 28, &mut errors);

        let weekly_day = if self.weekly_day.is_empty() {
            WeekDay::default()
        } else {
            self.weekly_day.parse::<WeekDay>().unwrap_or_else(|_| {
                errors.add("weekly_day", "Select a valid choice.");
                WeekDay::default()
            })
        };

        let backup_time = parse_time(&self.backup_time).unwrap_or_else(|| {
            errors.add("backup_time", "Enter a valid time.");
            NaiveTime::MIN
        });

        errors.into_result(BackupProfileFields {
            name,
            daily_backup: self.daily_backup,
            weekly_backup: self.weekly_backup,
            monthly_backup: self.monthly_backup,
            daily_retention,
            weekly_retention,
            monthly_retention,
            instant_retention,
            weekly_day,
            monthly_day,
            backup_time,
        })
    }

    /// `locked_name` renders the name read-only (the default profile)
    pub fn fields(&self, locked_name: bool, errors: &FieldErrors) -> Vec<FieldView> {
        let week_days = WeekDay::ALL
            .iter()
            .map(|d| SelectOption::new(d.as_str(), d.label(), self.weekly_day == d.as_str()))
            .collect();
        let name = FieldView::text("name", "Name", &self.name).required();
        let name = if locked_name {
            name.help("The default profile cannot be renamed")
        } else {
            name
        };

        vec![
            name,
            FieldView::checkbox("daily_backup", "Daily backup", self.daily_backup),
            FieldView::checkbox("weekly_backup", "Weekly backup", self.weekly_backup),
            FieldView::checkbox("monthly_backup", "Monthly backup", self.monthly_backup),
            FieldView::number("daily_retention", "Daily retention (days)", &self.daily_retention).required(),
            FieldView::number("weekly_retention", "Weekly retention (days)", &self.weekly_retention).required(),
            FieldView::number("monthly_retention", "Monthly retention (days)", &self.monthly_retention).required(),
            FieldView::number("instant_retention", "Instant retention (days)", &self.instant_retention).required(),
            FieldView::select("weekly_day", "Weekly backup day", week_days),
            FieldView::number("monthly_day", "Monthly backup day", &self.monthly_day)
                .required()
                .help("1 to 28"),
            FieldView::time("backup_time", "Backup time", &self.backup_time).required(),
        ]
        .into_iter()
        .map(|field| field.with_errors(errors))
        .collect()
    }
}
