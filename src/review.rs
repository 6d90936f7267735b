//! Review API payloads and the flattened record written to the output sink.

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// One reply from the review listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageResponse {
    #[serde(default, deserialize_with = "status")]
    pub success: i64,
    #[serde(default, deserialize_with = "entries")]
    pub reviews: Option<Vec<RawReview>>,
    #[serde(default, deserialize_with = "optional_string")]
    pub cursor: Option<String>,
    #[serde(default, deserialize_with = "summary")]
    pub query_summary: Option<QuerySummary>,
}

impl PageResponse {
    pub fn is_success(&self) -> bool {
        self.success == 1
    }

    pub fn reviews(&self) -> &[RawReview] {
        self.reviews.as_deref().unwrap_or_default()
    }

    /// The continuation token, with an empty string treated as absent.
    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }

    /// Reviews matching the query as of this page.
    ///
    /// A missing summary or missing `num_reviews` key counts as zero; a count
    /// that is present but null or unreadable is unknown (`None`) and does not
    /// end the crawl.
    pub fn summary_count(&self) -> Option<u64> {
        match &self.query_summary {
            Some(summary) => summary.num_reviews,
            None => Some(0),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuerySummary {
    #[serde(default = "absent_count", deserialize_with = "optional_u64")]
    pub num_reviews: Option<u64>,
    #[serde(default, deserialize_with = "optional_string")]
    pub review_score_desc: Option<String>,
    #[serde(default, deserialize_with = "optional_u64")]
    pub total_positive: Option<u64>,
    #[serde(default, deserialize_with = "optional_u64")]
    pub total_negative: Option<u64>,
    #[serde(default, deserialize_with = "optional_u64")]
    pub total_reviews: Option<u64>,
}

fn absent_count() -> Option<u64> {
    Some(0)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReview {
    #[serde(default, deserialize_with = "review_id")]
    pub recommendationid: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    pub language: Option<String>,
    #[serde(default, deserialize_with = "optional_string")]
    pub review: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub voted_up: bool,
    #[serde(default, deserialize_with = "flag")]
    pub steam_purchase: bool,
    #[serde(default, deserialize_with = "flag")]
    pub received_for_free: bool,
    #[serde(default, deserialize_with = "optional_u64")]
    pub votes_up: Option<u64>,
    #[serde(default, deserialize_with = "optional_u64")]
    pub votes_funny: Option<u64>,
    #[serde(default, deserialize_with = "optional_i64")]
    pub timestamp_created: Option<i64>,
    #[serde(default, deserialize_with = "optional_i64")]
    pub timestamp_updated: Option<i64>,
    #[serde(default, deserialize_with = "author")]
    pub author: Option<RawAuthor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAuthor {
    #[serde(default, deserialize_with = "optional_u64")]
    pub num_games_owned: Option<u64>,
    #[serde(default, deserialize_with = "optional_u64")]
    pub num_reviews: Option<u64>,
    #[serde(default, deserialize_with = "optional_u64")]
    pub playtime_forever: Option<u64>,
    #[serde(default, deserialize_with = "optional_u64")]
    pub playtime_at_review: Option<u64>,
}

// The decoders below accept any JSON value and map unexpected types to
// `None`/defaults instead of failing the page.

/// Entries that are not objects decode as an empty review (no id).
fn entries<'de, D>(deserializer: D) -> Result<Option<Vec<RawReview>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect(),
        ),
        _ => None,
    })
}

fn summary<'de, D>(deserializer: D) -> Result<Option<QuerySummary>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .filter(Value::is_object)
        .and_then(|v| serde_json::from_value(v).ok()))
}

/// `1` / `true` is success; anything else reads as not successful.
fn status<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => i64::from(b),
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        _ => 0,
    })
}

/// Integers, integral floats and numeric strings; anything else is `None`.
fn optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(as_i64))
}

fn optional_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) if n.is_u64() => n.as_u64(),
        Some(value) => as_i64(&value).and_then(|v| u64::try_from(v).ok()),
        None => None,
    })
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A non-object author reads as missing.
fn author<'de, D>(deserializer: D) -> Result<Option<RawAuthor>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .filter(Value::is_object)
        .and_then(|v| serde_json::from_value(v).ok()))
}

/// Accepts the identifier as a string or a number; empty strings count as missing.
fn review_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        _ => false,
    })
}

/// A single exported review row. Field order is the output column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewRecord {
    pub review_text: String,
    #[serde(serialize_with = "as_digit")]
    pub sentiment: bool,
    #[serde(serialize_with = "as_digit")]
    pub purchased: bool,
    #[serde(serialize_with = "as_digit")]
    pub received_for_free: bool,
    pub votes_up: Option<u64>,
    pub votes_funny: Option<u64>,
    pub date_created: String,
    pub date_updated: String,
    pub author_num_games_owned: Option<u64>,
    pub author_num_reviews: Option<u64>,
    pub author_playtime_forever_min: Option<u64>,
    pub author_playtime_at_review_min: Option<u64>,
}

fn as_digit<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u8(u8::from(*value))
}

impl ReviewRecord {
    pub const HEADER: [&'static str; 12] = [
        "review_text",
        "sentiment",
        "purchased",
        "received_for_free",
        "votes_up",
        "votes_funny",
        "date_created",
        "date_updated",
        "author_num_games_owned",
        "author_num_reviews",
        "author_playtime_forever_min",
        "author_playtime_at_review_min",
    ];
}

impl From<&RawReview> for ReviewRecord {
    fn from(raw: &RawReview) -> Self {
        let author = raw.author.clone().unwrap_or_default();
        Self {
            review_text: raw.review.as_deref().unwrap_or_default().trim().to_string(),
            sentiment: raw.voted_up,
            purchased: raw.steam_purchase,
            received_for_free: raw.received_for_free,
            votes_up: raw.votes_up,
            votes_funny: raw.votes_funny,
            date_created: utc_date(raw.timestamp_created),
            date_updated: utc_date(raw.timestamp_updated),
            author_num_games_owned: author.num_games_owned,
            author_num_reviews: author.num_reviews,
            author_playtime_forever_min: author.playtime_forever,
            author_playtime_at_review_min: author.playtime_at_review,
        }
    }
}

/// Converts epoch seconds to an ISO calendar date in UTC. Zero or missing yields "".
pub fn utc_date(timestamp: Option<i64>) -> String {
    match timestamp {
        Some(ts) if ts != 0 => DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.date_naive().to_string())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_utc_date() {
        assert_eq!(utc_date(Some(1_700_000_000)), "2023-11-14");
        assert_eq!(utc_date(Some(0)), "");
        assert_eq!(utc_date(None), "");
    }

    #[test]
    fn test_record_from_full_entry() {
        let raw: RawReview = serde_json::from_value(json!({
            "recommendationid": "150000001",
            "language": "english",
            "review": "  Great game, would play again.\n",
            "voted_up": true,
            "steam_purchase": false,
            "received_for_free": true,
            "votes_up": 12,
            "votes_funny": 3,
            "timestamp_created": 1700000000,
            "timestamp_updated": 0,
            "weighted_vote_score": "0.52",
            "author": {
                "steamid": "7656119",
                "num_games_owned": 250,
                "num_reviews": 9,
                "playtime_forever": 1200,
                "playtime_at_review": 600
            }
        }))
        .unwrap();

        let record = ReviewRecord::from(&raw);
        assert_eq!(record.review_text, "Great game, would play again.");
        assert!(record.sentiment);
        assert!(!record.purchased);
        assert!(record.received_for_free);
        assert_eq!(record.votes_up, Some(12));
        assert_eq!(record.date_created, "2023-11-14");
        assert_eq!(record.date_updated, "");
        assert_eq!(record.author_num_games_owned, Some(250));
        assert_eq!(record.author_playtime_at_review_min, Some(600));
    }

    #[test]
    fn test_sparse_entry_maps_to_nulls() {
        let raw: RawReview = serde_json::from_value(json!({
            "recommendationid": 42,
            "voted_up": null,
            "steam_purchase": 1
        }))
        .unwrap();

        assert_eq!(raw.recommendationid.as_deref(), Some("42"));
        let record = ReviewRecord::from(&raw);
        assert_eq!(record.review_text, "");
        assert!(!record.sentiment);
        assert!(record.purchased);
        assert_eq!(record.votes_funny, None);
        assert_eq!(record.author_num_reviews, None);
        assert_eq!(record.date_created, "");
    }

    #[test]
    fn test_empty_identifier_is_missing() {
        let raw: RawReview = serde_json::from_value(json!({ "recommendationid": "" })).unwrap();
        assert!(raw.recommendationid.is_none());
    }

    #[test]
    fn test_page_defaults() {
        let page: PageResponse = serde_json::from_value(json!({ "success": 1 })).unwrap();
        assert!(page.is_success());
        assert!(page.reviews().is_empty());
        assert_eq!(page.next_cursor(), None);
        assert_eq!(page.summary_count(), Some(0));

        let page: PageResponse = serde_json::from_value(json!({
            "success": 2,
            "reviews": null,
            "cursor": "",
            "query_summary": { "num_reviews": 100, "total_reviews": 5000 }
        }))
        .unwrap();
        assert!(!page.is_success());
        assert_eq!(page.next_cursor(), None);
        assert_eq!(page.summary_count(), Some(100));
    }

    #[test]
    fn test_summary_count_null_is_unknown() {
        let page: PageResponse = serde_json::from_value(json!({
            "success": 1,
            "query_summary": { "num_reviews": null }
        }))
        .unwrap();
        assert_eq!(page.summary_count(), None);

        let page: PageResponse =
            serde_json::from_value(json!({ "success": 1, "query_summary": {} })).unwrap();
        assert_eq!(page.summary_count(), Some(0));

        let page: PageResponse =
            serde_json::from_value(json!({ "success": 1, "query_summary": null })).unwrap();
        assert_eq!(page.summary_count(), Some(0));
    }

    #[test]
    fn test_odd_scalars_do_not_break_the_page() {
        let page: PageResponse = serde_json::from_value(json!({
            "success": true,
            "reviews": [
                { "recommendationid": "1", "votes_up": 3 },
                {
                    "recommendationid": "2",
                    "votes_up": "12",
                    "votes_funny": -1,
                    "timestamp_created": "1700000000",
                    "review": 42,
                    "author": { "playtime_forever": 12.0, "num_reviews": "n/a" }
                },
                { "recommendationid": "3", "author": "deleted", "voted_up": "yes" },
                null
            ],
            "cursor": "c1",
            "query_summary": { "num_reviews": 3.0 }
        }))
        .unwrap();

        assert!(page.is_success());
        assert_eq!(page.summary_count(), Some(3));
        assert_eq!(page.reviews().len(), 4);
        assert!(page.reviews()[3].recommendationid.is_none());

        let odd = ReviewRecord::from(&page.reviews()[1]);
        assert_eq!(odd.votes_up, Some(12));
        assert_eq!(odd.votes_funny, None);
        assert_eq!(odd.date_created, "2023-11-14");
        assert_eq!(odd.review_text, "42");
        assert_eq!(odd.author_playtime_forever_min, Some(12));
        assert_eq!(odd.author_num_reviews, None);

        let no_author = ReviewRecord::from(&page.reviews()[2]);
        assert_eq!(no_author.author_num_games_owned, None);
        assert!(no_author.sentiment);
    }

    #[test]
    fn test_success_flag_variants() {
        let cases = [
            (json!(1), true),
            (json!(true), true),
            (json!(false), false),
            (json!(2), false),
            (json!("1"), false),
        ];
        for (raw, ok) in cases {
            let page: PageResponse = serde_json::from_value(json!({ "success": raw })).unwrap();
            assert_eq!(page.is_success(), ok, "{}", raw);
        }
    }
}
