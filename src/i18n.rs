//! Language selection and projection of multi-language rows.
//!
//! Content is stored in three languages: English (`en`), Amharic (`am`) and
//! Afaan Oromo (`or`). Column-per-language tables keep `X_en`, `X_am` and
//! `X_or` side by side; [`Localized`] turns such a triple into either the
//! single-language value a client asked for or the full map.

use std::fmt;
use std::str::FromStr;

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, FieldErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, utoipa::ToSchema)]
pub enum Lang {
    #[default]
    #[serde(rename = "en")]
    En,
    #[serde(rename = "am")]
    Am,
    #[serde(rename = "or")]
    Or,
}

impl Lang {
    pub const ALL: [Lang; 3] = [Lang::En, Lang::Am, Lang::Or];

    pub fn code(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Am => "am",
            Lang::Or => "or",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("The selected language is invalid. Allowed: en, am, or.")]
pub struct UnknownLang;

impl FromStr for Lang {
    type Err = UnknownLang;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Lang::En),
            "am" => Ok(Lang::Am),
            // `om` is the ISO 639-1 code; the stored column suffix is `or`.
            "or" | "om" => Ok(Lang::Or),
            _ => Err(UnknownLang),
        }
    }
}

impl<'de> Deserialize<'de> for Lang {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// `?lang=` query parameter as documented in the API.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct LangQuery {
    /// `en`, `am` or `or` (`om` is accepted). Defaults to `en`.
    #[param(example = "en")]
    pub lang: Option<String>,
}

impl LangQuery {
    pub fn resolve(&self) -> Result<Lang, AppError> {
        match self.lang.as_deref().map(str::trim) {
            None | Some("") => Ok(Lang::default()),
            Some(raw) => raw
                .parse()
                .map_err(|e: UnknownLang| AppError::Validation(FieldErrors::single("lang", e.to_string()))),
        }
    }
}

/// Extracts the requested language; an unknown code is a 422 on `lang`.
#[derive(Debug, Clone, Copy)]
pub struct RequestLang(pub Lang);

impl<S> FromRequestParts<S> for RequestLang
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<LangQuery>::try_from_uri(&parts.uri)
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        query.resolve().map(RequestLang)
    }
}

/// Borrowed view over one localized group of columns.
#[derive(Debug, Clone, Copy)]
pub struct Localized<'a> {
    en: Option<&'a str>,
    am: Option<&'a str>,
    or: Option<&'a str>,
}

impl<'a> Localized<'a> {
    pub fn new(en: &'a Option<String>, am: &'a Option<String>, or: &'a Option<String>) -> Self {
        Self {
            en: en.as_deref(),
            am: am.as_deref(),
            or: or.as_deref(),
        }
    }

    /// Value for exactly `lang`. An empty column is treated as missing and
    /// no other language is substituted.
    pub fn get(&self, lang: Lang) -> Option<&'a str> {
        let value = match lang {
            Lang::En => self.en,
            Lang::Am => self.am,
            Lang::Or => self.or,
        };
        value.filter(|v| !v.trim().is_empty())
    }

    pub fn project(&self, lang: Lang) -> Value {
        self.get(lang).map_or(Value::Null, |v| Value::String(v.to_string()))
    }

    pub fn to_json(&self) -> Value {
        json!({
            "en": self.project(Lang::En),
            "am": self.project(Lang::Am),
            "or": self.project(Lang::Or),
        })
    }
}

/// Submitted values for one localized group. `None` means the column was not
/// part of the payload; `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalizedDraft {
    pub en: Option<Option<String>>,
    pub am: Option<Option<String>>,
    pub or: Option<Option<String>>,
}

impl LocalizedDraft {
    pub fn get(&self, lang: Lang) -> &Option<Option<String>> {
        match lang {
            Lang::En => &self.en,
            Lang::Am => &self.am,
            Lang::Or => &self.or,
        }
    }

    pub fn slot(&mut self, lang: Lang) -> &mut Option<Option<String>> {
        match lang {
            Lang::En => &mut self.en,
            Lang::Am => &mut self.am,
            Lang::Or => &mut self.or,
        }
    }

    /// Values to write on insert.
    pub fn into_columns(self) -> (Option<String>, Option<String>, Option<String>) {
        (
            self.en.flatten(),
            self.am.flatten(),
            self.or.flatten(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_and_oromo_alias() {
        assert_eq!("en".parse::<Lang>().unwrap(), Lang::En);
        assert_eq!("AM".parse::<Lang>().unwrap(), Lang::Am);
        assert_eq!("om".parse::<Lang>().unwrap(), Lang::Or);
        assert_eq!("or".parse::<Lang>().unwrap(), Lang::Or);
        assert!("fr".parse::<Lang>().is_err());
    }

    #[test]
    fn projection_differs_per_language() {
        let en = Some("Launch".to_string());
        let am = Some("ማስጀመሪያ".to_string());
        let or = Some("Eegalcha".to_string());
        let title = Localized::new(&en, &am, &or);

        assert_eq!(title.get(Lang::En), Some("Launch"));
        assert_eq!(title.get(Lang::Am), Some("ማስጀመሪያ"));
        assert_ne!(title.project(Lang::En), title.project(Lang::Or));
    }

    #[test]
    fn missing_language_does_not_fall_back_to_english() {
        let en = Some("Launch".to_string());
        let am = Some("   ".to_string());
        let or = None;
        let title = Localized::new(&en, &am, &or);

        assert_eq!(title.get(Lang::Am), None);
        assert_eq!(title.project(Lang::Or), Value::Null);
        assert_eq!(
            title.to_json(),
            json!({ "en": "Launch", "am": null, "or": null })
        );
    }

    #[test]
    fn lang_query_defaults_to_english_and_rejects_unknown_codes() {
        assert_eq!(LangQuery::default().resolve().unwrap(), Lang::En);

        let query = LangQuery {
            lang: Some("fr".into()),
        };
        let Err(AppError::Validation(errors)) = query.resolve() else {
            panic!("expected a validation error");
        };
        assert!(errors.contains("lang"));
    }
}
