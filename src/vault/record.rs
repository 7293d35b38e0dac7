use chrono::{DateTime, Datelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Normalized feed entry as handed over by the fetch collaborator. The core
/// never sees feed XML; it consumes this shape only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub author: Option<String>,
    pub published: Option<String>,
    pub language: Option<String>,
}

/// Canonical archived unit. `description_full` keeps the original markup
/// verbatim for archival fidelity; `published` is ISO 8601 in the vault's
/// configured local zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: Option<String>,
    pub title: String,
    pub description_full: String,
    pub image: Option<String>,
    pub categories: Vec<String>,
    pub author: Option<String>,
    pub published: Option<String>,
    pub language: String,
    pub url: String,
}

impl ItemRecord {
    /// The identity the dedup ledger tracks: resolved id, else url.
    pub fn identity(&self) -> Option<&str> {
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => Some(id),
            _ => match self.url.as_str() {
                "" => None,
                url => Some(url),
            },
        }
    }
}

/// Reduced projection used only by the global index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlimRecord {
    pub title: String,
    pub image: Option<String>,
    pub url: String,
    pub categories: Vec<String>,
}

impl From<&ItemRecord> for SlimRecord {
    fn from(record: &ItemRecord) -> Self {
        Self {
            title: record.title.clone(),
            image: record.image.clone(),
            url: record.url.clone(),
            categories: record.categories.clone(),
        }
    }
}

/// Calendar-day partition key in the vault's fixed local zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayKey {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl DayKey {
    pub fn from_datetime(dt: &DateTime<Tz>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
        }
    }

    pub fn month_dir(&self, data_dir: &Path) -> PathBuf {
        data_dir
            .join(format!("{}", self.year))
            .join(format!("{:02}", self.month))
    }

    pub fn file_name(&self) -> String {
        format!("{:02}-{:02}.json", self.day, self.month)
    }

    pub fn partition_path(&self, data_dir: &Path) -> PathBuf {
        self.month_dir(data_dir).join(self.file_name())
    }
}

fn normalize(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

/// Parse an RFC 3339 timestamp and shift it into the local zone. Anything
/// unparsable is dropped, matching the archive's "missing published" path.
pub fn published_local(published: Option<&str>, zone: Tz) -> Option<DateTime<Tz>> {
    let raw = published?.trim();
    let parsed = DateTime::parse_from_rfc3339(raw).ok()?;
    Some(parsed.with_timezone(&zone))
}

/// Day partition key for a record: its published date when present and
/// parseable, else the processing time handed in by the coordinator.
pub fn day_key_for(published: Option<&str>, zone: Tz, now: &DateTime<Tz>) -> DayKey {
    match published_local(published, zone) {
        Some(dt) => DayKey::from_datetime(&dt),
        None => DayKey::from_datetime(now),
    }
}

/// Build the canonical record from a normalized entry. Identity priority is
/// source id, then canonical url, then title; all-absent leaves `id` unset
/// and the record is always treated as new downstream.
pub fn build_record(entry: &FeedEntry, zone: Tz, default_language: &str) -> ItemRecord {
    let id = normalize(entry.id.as_deref())
        .or_else(|| normalize(entry.link.as_deref()))
        .or_else(|| normalize(entry.title.as_deref()));

    let published = published_local(entry.published.as_deref(), zone).map(|dt| dt.to_rfc3339());

    ItemRecord {
        id,
        title: entry.title.clone().unwrap_or_default(),
        description_full: entry.description.clone().unwrap_or_default(),
        image: normalize(entry.thumbnail.as_deref()),
        categories: entry.categories.clone(),
        author: normalize(entry.author.as_deref()),
        published,
        language: normalize(entry.language.as_deref())
            .unwrap_or_else(|| default_language.to_string()),
        url: normalize(entry.link.as_deref()).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::{DayKey, FeedEntry, SlimRecord, build_record, day_key_for};
    use chrono::TimeZone;
    use chrono_tz::Tz;
    use std::path::Path;

    fn zone() -> Tz {
        "Africa/Casablanca".parse().expect("zone")
    }

    fn entry(id: Option<&str>, link: Option<&str>, title: Option<&str>) -> FeedEntry {
        FeedEntry {
            id: id.map(str::to_string),
            link: link.map(str::to_string),
            title: title.map(str::to_string),
            ..FeedEntry::default()
        }
    }

    #[test]
    fn identity_prefers_source_id_then_url_then_title() {
        let z = zone();
        let rec = build_record(&entry(Some("guid-1"), Some("https://x/a"), Some("T")), z, "ar-SA");
        assert_eq!(rec.id.as_deref(), Some("guid-1"));

        let rec = build_record(&entry(None, Some("https://x/a"), Some("T")), z, "ar-SA");
        assert_eq!(rec.id.as_deref(), Some("https://x/a"));

        let rec = build_record(&entry(None, None, Some("T")), z, "ar-SA");
        assert_eq!(rec.id.as_deref(), Some("T"));

        let rec = build_record(&entry(None, None, None), z, "ar-SA");
        assert_eq!(rec.id, None);
        assert_eq!(rec.identity(), None);
    }

    #[test]
    fn blank_id_falls_through_to_url() {
        let rec = build_record(&entry(Some("   "), Some("https://x/a"), None), zone(), "ar-SA");
        assert_eq!(rec.id.as_deref(), Some("https://x/a"));
    }

    #[test]
    fn default_language_applies_when_entry_has_none() {
        let rec = build_record(&entry(Some("g"), None, None), zone(), "ar-SA");
        assert_eq!(rec.language, "ar-SA");
    }

    #[test]
    fn published_is_shifted_into_local_zone() {
        let z = zone();
        let mut e = entry(Some("g"), None, None);
        // Midnight UTC lands on the same calendar day in Casablanca (UTC+1).
        e.published = Some("2025-11-09T00:30:00Z".to_string());
        let rec = build_record(&e, z, "ar-SA");
        let now = z.with_ymd_and_hms(2025, 12, 1, 8, 0, 0).single().expect("now");
        let key = day_key_for(rec.published.as_deref(), z, &now);
        assert_eq!(key, DayKey { year: 2025, month: 11, day: 9 });
    }

    #[test]
    fn unparsable_published_falls_back_to_processing_day() {
        let z = zone();
        let now = z.with_ymd_and_hms(2025, 12, 1, 8, 0, 0).single().expect("now");
        let key = day_key_for(Some("yesterday-ish"), z, &now);
        assert_eq!(key, DayKey { year: 2025, month: 12, day: 1 });
    }

    #[test]
    fn partition_path_layout_is_year_month_day() {
        let key = DayKey { year: 2025, month: 11, day: 9 };
        let path = key.partition_path(Path::new("data"));
        assert_eq!(path, Path::new("data/2025/11/09-11.json"));
    }

    #[test]
    fn slim_projection_keeps_search_fields_only() {
        let z = zone();
        let mut e = entry(Some("g"), Some("https://x/a"), Some("Title"));
        e.thumbnail = Some("https://img/a.jpg".to_string());
        e.categories = vec!["anime".to_string()];
        e.description = Some("<p>full markup</p>".to_string());
        let rec = build_record(&e, z, "ar-SA");
        let slim = SlimRecord::from(&rec);
        assert_eq!(slim.title, "Title");
        assert_eq!(slim.url, "https://x/a");
        assert_eq!(slim.image.as_deref(), Some("https://img/a.jpg"));
        assert_eq!(slim.categories, vec!["anime".to_string()]);
    }
}
