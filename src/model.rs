use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Book scalar fields, as nested inside a history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: i64,
    pub name: Option<String>,
    pub author: Option<String>,
    pub number_of_pages: Option<i32>,
    pub photo: Option<String>,
    pub create_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    #[serde(flatten)]
    pub summary: BookSummary,
    pub histories: Vec<HistorySummary>,
}

/// History scalar fields, as nested inside a book.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub id: i64,
    pub content: Option<String>,
    pub from_page: Option<i32>,
    pub to_page: Option<i32>,
    pub tag: Option<String>,
    pub create_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct History {
    #[serde(flatten)]
    pub summary: HistorySummary,
    pub books: Vec<BookSummary>,
}

/// Request body for creating or overwriting a book.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    pub name: Option<String>,
    pub author: Option<String>,
    pub number_of_pages: Option<i32>,
    pub photo: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub create_date: Option<NaiveDateTime>,
    #[serde(rename = "history_ids")]
    pub history_ids: Option<Vec<i64>>,
}

/// Request body for creating or overwriting a reading history.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryInput {
    pub content: Option<String>,
    pub from_page: Option<i32>,
    pub to_page: Option<i32>,
    pub tag: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub create_date: Option<NaiveDateTime>,
    #[serde(rename = "book_ids")]
    pub book_ids: Option<Vec<i64>>,
}

pub mod timestamp {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, de};

    /// Storage format, identical to chrono's serde output.
    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    pub fn format(value: &NaiveDateTime) -> String {
        value.format(FORMAT).to_string()
    }

    pub fn parse(value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.naive_utc())
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(value, FORMAT).ok())
            .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").ok())
            .or_else(|| DateTime::parse_from_rfc2822(value).map(|dt| dt.naive_utc()).ok())
            .or_else(|| {
                NaiveDate::parse_from_str(value, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| parse(&s).ok_or_else(|| de::Error::custom(format!("invalid date: {s}"))))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 10, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn parses_supported_date_formats() {
        for raw in [
            "2024-10-15T12:00:00",
            "2024-10-15T12:00:00Z",
            "2024-10-15T14:00:00+02:00",
            "2024-10-15 12:00:00",
            "Tue, 15 Oct 2024 12:00:00 GMT",
        ] {
            assert_eq!(timestamp::parse(raw), Some(noon()), "{raw}");
        }
        assert_eq!(
            timestamp::parse("2024-10-15"),
            NaiveDate::from_ymd_opt(2024, 10, 15).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(timestamp::parse("yesterday"), None);
    }

    #[test]
    fn storage_format_round_trips() {
        let value = noon() + chrono::Duration::nanoseconds(123_456_789);
        assert_eq!(timestamp::parse(&timestamp::format(&value)), Some(value));
    }

    #[test]
    fn book_input_reads_wire_names() {
        let input: BookInput = serde_json::from_str(
            r#"{"name":"Dune","numberOfPages":412,"createDate":"2024-10-15","history_ids":[1,2]}"#,
        )
        .unwrap();
        assert_eq!(input.name.as_deref(), Some("Dune"));
        assert_eq!(input.number_of_pages, Some(412));
        assert!(input.create_date.is_some());
        assert_eq!(input.history_ids, Some(vec![1, 2]));
        assert!(input.author.is_none());
    }

    #[test]
    fn history_input_rejects_bad_dates() {
        let result = serde_json::from_str::<HistoryInput>(r#"{"createDate":"soon"}"#);
        assert!(result.is_err());
        let input: HistoryInput =
            serde_json::from_str(r#"{"createDate":null,"book_ids":[]}"#).unwrap();
        assert!(input.create_date.is_none());
        assert_eq!(input.book_ids, Some(vec![]));
    }

    #[test]
    fn book_serializes_flat_with_nested_summaries() {
        let book = Book {
            summary: BookSummary {
                id: 1,
                name: Some("Dune".into()),
                author: None,
                number_of_pages: Some(412),
                photo: None,
                create_date: noon(),
            },
            histories: vec![HistorySummary {
                id: 7,
                content: Some("ch. 1".into()),
                from_page: Some(1),
                to_page: Some(20),
                tag: None,
                create_date: noon(),
            }],
        };
        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["numberOfPages"], 412);
        assert_eq!(json["createDate"], "2024-10-15T12:00:00");
        assert_eq!(json["histories"][0]["fromPage"], 1);
        assert!(json["histories"][0].get("books").is_none());
    }
}
