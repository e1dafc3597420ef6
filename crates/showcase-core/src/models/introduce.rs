use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Tag marking a card as a production offering.
pub const PRODUCTION_TAG: &str = "Production";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    #[default]
    Active,
    Inactive,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Status::Active),
            "INACTIVE" => Ok(Status::Inactive),
            _ => Err(format!("Unknown status '{}', expected ACTIVE or INACTIVE", s)),
        }
    }
}

/// A catalogue card as returned by the content API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Introduce {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tag: Option<String>,
    pub image_id: Option<String>,
    pub url: Option<String>,
    pub create_at: Option<String>,
    pub modified_at: Option<String>,
    pub status: Option<Status>,
}

impl Introduce {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }

    pub fn is_production(&self) -> bool {
        self.tag
            .as_deref()
            .map(|tag| tag.eq_ignore_ascii_case(PRODUCTION_TAG))
            .unwrap_or(false)
    }

    pub fn is_active(&self) -> bool {
        self.status.unwrap_or_default() == Status::Active
    }

    /// Case-insensitive match on the title.
    pub fn title_matches(&self, query: &str) -> bool {
        self.title
            .as_deref()
            .map(|title| title.to_lowercase().contains(&query.to_lowercase()))
            .unwrap_or(false)
    }

    pub fn created_at(&self) -> Option<NaiveDateTime> {
        self.create_at.as_deref().and_then(parse_timestamp)
    }

    pub fn updated_at(&self) -> Option<NaiveDateTime> {
        self.modified_at.as_deref().and_then(parse_timestamp)
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Fields for a new card. `tag` is sent as an empty string when absent.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIntroduce {
    pub title: String,
    pub description: String,
    pub tag: Option<String>,
    pub url: String,
    pub status: Status,
}

/// Partial update: only fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntroduceUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tag: Option<String>,
    pub url: Option<String>,
    pub status: Status,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_introduce() {
        let json = r#"{"id":"66a1","title":"SMART CA","description":"Digital signatures","tag":"production","imageId":"img1","url":"https://example.com","createAt":"2024-05-01T10:20:30.123","modifiedAt":null,"status":"INACTIVE"}"#;
        let introduce: Introduce = serde_json::from_str(json).unwrap();

        assert_eq!(introduce.display_title(), "SMART CA");
        assert_eq!(introduce.image_id.as_deref(), Some("img1"));
        assert!(introduce.is_production());
        assert!(!introduce.is_active());
        assert_eq!(
            introduce.created_at().unwrap().format("%Y-%m-%d %H:%M").to_string(),
            "2024-05-01 10:20"
        );
        assert!(introduce.updated_at().is_none());
    }

    #[test]
    fn test_missing_fields_default() {
        let introduce: Introduce = serde_json::from_str(r#"{"id":"1"}"#).unwrap();
        assert_eq!(introduce.display_title(), "(untitled)");
        assert!(!introduce.is_production());
        assert!(introduce.is_active());
        assert!(!introduce.title_matches("a"));
    }

    #[test]
    fn test_title_matches_ignores_case() {
        let introduce: Introduce = serde_json::from_str(r#"{"id":"1","title":"VNPT SmartCloud"}"#).unwrap();
        assert!(introduce.title_matches("smartcloud"));
        assert!(introduce.title_matches("VNPT"));
        assert!(!introduce.title_matches("invoice"));
    }

    #[test]
    fn test_status_parse_and_display() {
        assert_eq!("active".parse::<Status>().unwrap(), Status::Active);
        assert_eq!("INACTIVE".parse::<Status>().unwrap(), Status::Inactive);
        assert!("archived".parse::<Status>().is_err());
        assert_eq!(Status::Inactive.to_string(), "INACTIVE");
        assert_eq!(serde_json::to_string(&Status::Active).unwrap(), "\"ACTIVE\"");
    }
}
