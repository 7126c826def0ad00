//! Request payload extraction and field-rule checking.
//!
//! Mutating endpoints accept `multipart/form-data`, JSON or urlencoded
//! bodies. All three are normalised into a [`FormData`]; a [`FormReader`]
//! then pulls typed values out of it, recording every broken rule instead of
//! stopping at the first one. String-shape rules (length, email, url, range)
//! are declared on the draft structs with `validator` and merged into the same
//! error map by [`FormReader::finish`].

use std::collections::HashMap;

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use chrono::{NaiveDate, NaiveTime};
use sea_orm::ActiveEnum;
use serde_json::Value;
use validator::Validate;

use crate::error::{AppError, FieldErrors};
use crate::i18n::{Lang, LocalizedDraft};
use crate::services::media::{Category, UploadedFile};

#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: HashMap<String, Value>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl FormData {
    pub fn from_json(value: Value) -> Result<Self, AppError> {
        match value {
            Value::Object(map) => Ok(Self {
                fields: map.into_iter().collect(),
                files: HashMap::new(),
            }),
            Value::Null => Ok(Self::default()),
            _ => Err(AppError::BadRequest(
                "Request body must be a JSON object".to_string(),
            )),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with_file(mut self, name: &str, file: UploadedFile) -> Self {
        self.files.entry(name.to_string()).or_default().push(file);
        self
    }

    fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    fn files(&self, name: &str) -> &[UploadedFile] {
        self.files.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = FormData::default();
        let mut lists: HashMap<String, Vec<Value>> = HashMap::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let Some(raw_name) = field.name().map(str::to_string) else {
                continue;
            };
            let (name, is_list) = match raw_name.strip_suffix("[]") {
                Some(base) => (base.to_string(), true),
                None => (raw_name, false),
            };

            if let Some(file_name) = field.file_name().map(str::to_string) {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                // Browsers send an empty part for an untouched file input.
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                form.files.entry(name).or_default().push(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                if is_list {
                    lists.entry(name).or_default().push(Value::String(text));
                } else {
                    form.fields.insert(name, Value::String(text));
                }
            }
        }

        for (name, values) in lists {
            form.fields.insert(name, Value::Array(values));
        }
        Ok(form)
    }
}

impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            FormData::from_multipart(multipart).await
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            Ok(FormData {
                fields: fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
                files: HashMap::new(),
            })
        } else if content_type.is_empty() {
            let body = axum::body::Bytes::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if body.iter().all(u8::is_ascii_whitespace) {
                Ok(FormData::default())
            } else {
                serde_json::from_slice::<Value>(&body)
                    .map_err(|e| AppError::BadRequest(format!("Malformed request body: {e}")))
                    .and_then(FormData::from_json)
            }
        } else {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            FormData::from_json(value)
        }
    }
}

/// Whether absent fields are an error (create) or mean "leave unchanged"
/// (update).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

pub struct FormReader<'a> {
    form: &'a FormData,
    mode: Mode,
    errors: FieldErrors,
}

impl<'a> FormReader<'a> {
    pub fn new(form: &'a FormData, mode: Mode) -> Self {
        Self {
            form,
            mode,
            errors: FieldErrors::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains(field)
    }

    /// Ends a read that has no draft to validate.
    pub fn check(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }

    /// Combines coercion errors with the draft's declared rules.
    pub fn finish<T: Validate>(mut self, draft: T) -> Result<T, AppError> {
        if let Err(errors) = draft.validate() {
            self.errors.merge(errors.into());
        }
        self.check().map(|()| draft)
    }

    fn label(field: &str) -> String {
        field.replace('_', " ")
    }

    fn missing(&mut self, field: &str) {
        self.errors
            .add(field, format!("The {} field is required.", Self::label(field)));
    }

    /// Raw text of a field: `None` when absent, `Some(None)` when explicitly
    /// empty or null. Strings are trimmed.
    fn raw(&mut self, field: &str) -> Option<Option<String>> {
        let value = self.form.field(field)?;
        match value {
            Value::Null => Some(None),
            Value::String(s) => {
                let trimmed = s.trim();
                Some((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Value::Number(n) => Some(Some(n.to_string())),
            Value::Bool(b) => Some(Some(b.to_string())),
            Value::Array(_) | Value::Object(_) => {
                self.errors
                    .add(field, format!("The {} must be a string.", Self::label(field)));
                Some(None)
            }
        }
    }

    fn required_raw(&mut self, field: &str) -> Option<String> {
        match self.raw(field) {
            Some(Some(value)) => Some(value),
            Some(None) => {
                if !self.errors.contains(field) {
                    self.missing(field);
                }
                None
            }
            None => {
                if self.mode == Mode::Create {
                    self.missing(field);
                }
                None
            }
        }
    }

    /// Required on create; on update only checked when supplied.
    pub fn required_text(&mut self, field: &str) -> Option<String> {
        self.required_raw(field)
    }

    pub fn text(&mut self, field: &str) -> Option<Option<String>> {
        self.raw(field)
    }

    fn parse_with<T>(
        &mut self,
        field: &str,
        raw: Option<String>,
        parse: impl Fn(&str) -> Option<T>,
        expected: &str,
    ) -> Option<T> {
        let raw = raw?;
        match parse(&raw) {
            Some(value) => Some(value),
            None => {
                self.errors.add(
                    field,
                    format!("The {} {expected}.", Self::label(field)),
                );
                None
            }
        }
    }

    fn nullable_with<T>(
        &mut self,
        field: &str,
        parse: impl Fn(&str) -> Option<T>,
        expected: &str,
    ) -> Option<Option<T>> {
        match self.raw(field)? {
            None => Some(None),
            Some(raw) => self
                .parse_with(field, Some(raw), parse, expected)
                .map(Some),
        }
    }

    pub fn required_date(&mut self, field: &str) -> Option<NaiveDate> {
        let raw = self.required_raw(field);
        self.parse_with(field, raw, parse_date, "is not a valid date")
    }

    pub fn date(&mut self, field: &str) -> Option<Option<NaiveDate>> {
        self.nullable_with(field, parse_date, "is not a valid date")
    }

    /// `HH:MM` (seconds accepted and dropped).
    pub fn time(&mut self, field: &str) -> Option<Option<String>> {
        self.nullable_with(
            field,
            |s| {
                NaiveTime::parse_from_str(s, "%H:%M")
                    .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
                    .ok()
                    .map(|t| t.format("%H:%M").to_string())
            },
            "must match the format H:i",
        )
    }

    pub fn integer(&mut self, field: &str) -> Option<Option<i32>> {
        self.nullable_with(field, |s| s.parse().ok(), "must be an integer")
    }

    pub fn number(&mut self, field: &str) -> Option<Option<f64>> {
        self.nullable_with(
            field,
            |s| s.parse::<f64>().ok().filter(|n| n.is_finite()),
            "must be a number",
        )
    }

    pub fn boolean(&mut self, field: &str) -> Option<bool> {
        let raw = self.raw(field)??;
        self.parse_with(field, Some(raw), parse_bool, "field must be true or false")
    }

    pub fn required_choice<T: ActiveEnum<Value = String>>(&mut self, field: &str) -> Option<T> {
        let raw = self.required_raw(field);
        self.parse_with(field, raw, parse_enum::<T>, &one_of::<T>())
    }

    pub fn choice<T: ActiveEnum<Value = String>>(&mut self, field: &str) -> Option<T> {
        let raw = self.raw(field)??;
        self.parse_with(field, Some(raw), parse_enum::<T>, &one_of::<T>())
    }

    /// JSON array or object. Multipart clients send it as a JSON string.
    pub fn structured(&mut self, field: &str) -> Option<Option<Value>> {
        let value = self.form.field(field)?;
        let parsed = match value {
            Value::Null => return Some(None),
            Value::String(s) if s.trim().is_empty() => return Some(None),
            Value::String(s) => serde_json::from_str::<Value>(s).ok(),
            other => Some(other.clone()),
        };
        match parsed {
            Some(v @ (Value::Array(_) | Value::Object(_))) => Some(Some(v)),
            _ => {
                self.errors.add(
                    field,
                    format!("The {} must be a valid JSON array or object.", Self::label(field)),
                );
                None
            }
        }
    }

    /// List of strings, accepted as a JSON array, a JSON-encoded string or
    /// repeated `field[]` parts.
    pub fn string_list(&mut self, field: &str) -> Option<Vec<String>> {
        let value = self.structured(field)??;
        match value {
            Value::Array(items) if items.iter().all(Value::is_string) => Some(
                items
                    .into_iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => {
                self.errors.add(
                    field,
                    format!("The {} must be a list of strings.", Self::label(field)),
                );
                None
            }
        }
    }

    pub fn file(&mut self, field: &str, category: Category) -> Option<UploadedFile> {
        let files = self.form.files(field);
        let file = files.first()?;
        if files.len() > 1 {
            self.errors.add(
                field,
                format!("The {} must be a single file.", Self::label(field)),
            );
            return None;
        }
        self.checked(field, file, category)
    }

    pub fn required_file(&mut self, field: &str, category: Category) -> Option<UploadedFile> {
        let file = self.file(field, category);
        if file.is_none()
            && self.mode == Mode::Create
            && self.form.files(field).is_empty()
        {
            self.missing(field);
        }
        file
    }

    pub fn files(&mut self, field: &str, category: Category) -> Vec<UploadedFile> {
        let files = self.form.files(field);
        let mut accepted = Vec::with_capacity(files.len());
        for (index, file) in files.iter().enumerate() {
            let key = format!("{field}.{index}");
            if let Some(file) = self.checked(&key, file, category) {
                accepted.push(file);
            }
        }
        accepted
    }

    fn checked(&mut self, field: &str, file: &UploadedFile, category: Category) -> Option<UploadedFile> {
        match category.policy.check(field, file) {
            Ok(_) => Some(file.clone()),
            Err(problems) => {
                for problem in problems {
                    self.errors.add(field, problem);
                }
                None
            }
        }
    }

    /// Collects a localized group (`{group}_en`, `_am`, `_or`).
    pub fn localized(&mut self, group: &str, presence: Presence, max_chars: Option<usize>) -> LocalizedDraft {
        let mut draft = LocalizedDraft::default();
        for lang in Lang::ALL {
            let field = format!("{group}_{lang}");
            let required = match presence {
                Presence::Optional => false,
                Presence::English => lang == Lang::En,
                Presence::All => true,
            };
            let value = if required {
                self.required_raw(&field).map(Some)
            } else {
                self.raw(&field)
            };
            if let (Some(max), Some(Some(text))) = (max_chars, &value) {
                if text.chars().count() > max {
                    self.errors.add(
                        field.as_str(),
                        format!("The {} must not be greater than {max} characters.", Self::label(&field)),
                    );
                }
            }
            *draft.slot(lang) = value;
        }
        draft
    }
}

/// Which languages of a localized group must be present on create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Optional,
    English,
    All,
}

fn parse_enum<T: ActiveEnum<Value = String>>(raw: &str) -> Option<T> {
    T::try_from_value(&raw.to_ascii_lowercase()).ok()
}

fn one_of<T: ActiveEnum<Value = String>>() -> String {
    format!("must be one of: {}", T::values().join(", "))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Fails with a field error when a value guaranteed by validation is absent.
pub fn present<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| {
        AppError::Validation(FieldErrors::single(
            field,
            format!("The {} field is required.", field.replace('_', " ")),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::media::tests::jpeg;
    use serde_json::json;

    use kind::Kind;

    mod kind {
        use sea_orm::entity::prelude::*;

        #[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
        #[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
        pub enum Kind {
            #[sea_orm(string_value = "upcoming")]
            Upcoming,
            #[sea_orm(string_value = "past")]
            Past,
        }
    }

    #[derive(Debug, Validate)]
    struct Empty {
        #[validate(length(max = 255))]
        note: Option<String>,
    }

    const EMPTY: Empty = Empty { note: None };

    #[test]
    fn create_reports_every_failing_field_at_once() {
        let form = FormData::from_json(json!({
            "type": "someday",
            "date": "not-a-date",
        }))
        .unwrap()
        .with_file("image", jpeg(3 * 1024 * 1024));

        let mut reader = FormReader::new(&form, Mode::Create);
        let _title = reader.localized("title", Presence::English, Some(255));
        let _kind: Option<Kind> = reader.required_choice("type");
        let _date = reader.required_date("date");
        let _image = reader.file("image", Category::image("events"));
        let err = reader.finish(EMPTY).unwrap_err();

        let AppError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.contains("title_en"));
        assert_eq!(
            errors.get("type").unwrap(),
            ["The type must be one of: upcoming, past."]
        );
        assert!(errors.contains("date"));
        assert!(errors.contains("image"));
    }

    #[test]
    fn update_ignores_absent_required_fields() {
        let form = FormData::from_json(json!({ "title_en": "Launch v2" })).unwrap();
        let mut reader = FormReader::new(&form, Mode::Update);

        let title = reader.localized("title", Presence::English, Some(255));
        let kind: Option<Kind> = reader.required_choice("type");
        let date = reader.required_date("date");

        assert_eq!(title.en, Some(Some("Launch v2".to_string())));
        assert_eq!(title.am, None);
        assert_eq!(kind, None);
        assert_eq!(date, None);
        assert!(reader.finish(EMPTY).is_ok());
    }

    #[test]
    fn update_rejects_blanking_a_required_field() {
        let form = FormData::from_json(json!({ "title_en": "  " })).unwrap();
        let mut reader = FormReader::new(&form, Mode::Update);
        reader.localized("title", Presence::English, Some(255));
        assert!(reader.has_errors());
    }

    #[test]
    fn all_languages_can_be_mandatory_and_length_is_checked() {
        let form = FormData::from_json(json!({
            "title_en": "Best Film",
            "title_or": "x".repeat(300),
        }))
        .unwrap();
        let mut reader = FormReader::new(&form, Mode::Create);
        reader.localized("title", Presence::All, Some(255));
        let Err(AppError::Validation(errors)) = reader.finish(EMPTY) else {
            panic!("expected validation error");
        };

        assert!(!errors.contains("title_en"));
        assert_eq!(errors.get("title_am").unwrap(), ["The title am field is required."]);
        assert_eq!(
            errors.get("title_or").unwrap(),
            ["The title or must not be greater than 255 characters."]
        );
    }

    #[test]
    fn nullable_fields_distinguish_absent_from_cleared() {
        let form = FormData::from_json(json!({ "location": "", "time": "18:00:00" })).unwrap();
        let mut reader = FormReader::new(&form, Mode::Update);

        assert_eq!(reader.text("location"), Some(None));
        assert_eq!(reader.text("description_en"), None);
        assert_eq!(reader.time("time"), Some(Some("18:00".to_string())));
    }

    #[test]
    fn structured_fields_accept_json_strings() {
        let form = FormData::default()
            .with_field("features", "[\"fast\",\"local\"]")
            .with_field("stats", "{not json");
        let mut reader = FormReader::new(&form, Mode::Create);

        assert_eq!(
            reader.string_list("features"),
            Some(vec!["fast".to_string(), "local".to_string()])
        );
        assert_eq!(reader.structured("stats"), None);
        assert!(reader.has_errors());
    }

    #[test]
    fn numbers_and_booleans_coerce_from_text() {
        let form = FormData::default()
            .with_field("year", "2024")
            .with_field("price", "12.5")
            .with_field("is_read", "1");
        let mut reader = FormReader::new(&form, Mode::Create);

        assert_eq!(reader.integer("year"), Some(Some(2024)));
        assert_eq!(reader.number("price"), Some(Some(12.5)));
        assert_eq!(reader.boolean("is_read"), Some(true));
    }
}
