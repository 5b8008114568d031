//! Data models for the reaction search.
//!
//! This module contains the openFDA wire types, the aggregated
//! reaction counts, and the JSON contract served by the backend.

use serde::{Deserialize, Serialize};

/// One adverse-event report as returned by openFDA (`results[]`).
///
/// Only the fields needed for aggregation are decoded; everything else
/// in the report is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReactionRecord {
    /// Patient section of the report.
    #[serde(default)]
    pub patient: Option<Patient>,
}

impl ReactionRecord {
    /// Build a record from `(term, outcome)` pairs.
    #[cfg(test)]
    pub fn from_reactions<I, T>(reactions: I) -> Self
    where
        I: IntoIterator<Item = (T, Option<T>)>,
        T: Into<String>,
    {
        let reaction = reactions
            .into_iter()
            .map(|(term, outcome)| Reaction {
                term: term.into(),
                outcome: outcome.map(Into::into),
            })
            .collect();

        Self {
            patient: Some(Patient { reaction }),
        }
    }

    /// Reactions listed in this report, in report order.
    pub fn reactions(&self) -> &[Reaction] {
        self.patient
            .as_ref()
            .map(|p| p.reaction.as_slice())
            .unwrap_or_default()
    }
}

/// Patient section of a report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Patient {
    #[serde(default)]
    pub reaction: Vec<Reaction>,
}

/// A single reported reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// MedDRA preferred term, e.g. `NAUSEA`.
    #[serde(rename = "reactionmeddrapt", default)]
    pub term: String,
    /// Outcome code as sent by openFDA (a numeric string when present).
    #[serde(
        rename = "reactionoutcome",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub outcome: Option<String>,
}

/// Aggregated count for one reaction term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionCount {
    pub term: String,
    pub count: i64,
}

impl ReactionCount {
    pub fn new(term: impl Into<String>, count: i64) -> Self {
        Self {
            term: term.into(),
            count,
        }
    }
}

/// openFDA response envelope for `drug/event.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenFdaResponse {
    #[serde(default)]
    pub meta: OpenFdaMeta,
    #[serde(default)]
    pub results: Vec<ReactionRecord>,
}

/// `meta` block of an openFDA response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenFdaMeta {
    #[serde(default)]
    pub disclaimer: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub results: OpenFdaResultsMeta,
}

/// `meta.results` block of an openFDA response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenFdaResultsMeta {
    #[serde(default)]
    pub total: u64,
}

/// Metadata returned alongside every page by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub disclaimer: String,
    pub last_updated: String,
    pub total: u64,
}

impl From<&OpenFdaMeta> for ResponseMeta {
    fn from(meta: &OpenFdaMeta) -> Self {
        Self {
            disclaimer: meta.disclaimer.clone(),
            last_updated: meta.last_updated.clone(),
            total: meta.results.total,
        }
    }
}

/// JSON body of a successful `GET /api/drug-reactions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub reactions: Vec<ReactionCount>,
    pub meta: ResponseMeta,
    /// Absolute URL of the next page, carrying the `search_after` cursor.
    pub next_page_url: Option<String>,
}

/// JSON body of a failed backend request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_openfda_response() {
        let body = r#"{
            "meta": {
                "disclaimer": "Do not rely on openFDA",
                "last_updated": "2024-05-23",
                "results": {"skip": 0, "limit": 2, "total": 1234}
            },
            "results": [
                {"patient": {"reaction": [
                    {"reactionmeddrapt": "NAUSEA", "reactionoutcome": "1"},
                    {"reactionmeddrapt": "HEADACHE"}
                ]}},
                {"safetyreportid": "10003304"}
            ]
        }"#;

        let response: OpenFdaResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.meta.results.total, 1234);
        assert_eq!(response.results.len(), 2);

        let first = response.results[0].reactions();
        assert_eq!(first[0].term, "NAUSEA");
        assert_eq!(first[0].outcome.as_deref(), Some("1"));
        assert_eq!(first[1].outcome, None);
        assert!(response.results[1].reactions().is_empty());
    }

    #[test]
    fn test_api_response_uses_camel_case() {
        let response = ApiResponse {
            reactions: vec![ReactionCount::new("PAIN", 3)],
            meta: ResponseMeta {
                disclaimer: "d".to_string(),
                last_updated: "2024-05-23".to_string(),
                total: 10,
            },
            next_page_url: None,
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["meta"]["lastUpdated"], "2024-05-23");
        assert_eq!(value["reactions"][0]["term"], "PAIN");
        assert!(value["nextPageUrl"].is_null());
    }

    #[test]
    fn test_error_body_omits_missing_details() {
        let body = ErrorBody {
            error: "Rate limit exceeded".to_string(),
            details: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"Rate limit exceeded"}"#);
    }
}
