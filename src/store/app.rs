//! App records: the raw iTunes lookup shape and the cleaned form served to
//! callers.

use serde::{Deserialize, Serialize};

/// One entry of a lookup response's `results` array, as iTunes sends it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawApp {
    pub wrapper_type: Option<String>,
    pub track_id: Option<u64>,
    pub bundle_id: Option<String>,
    pub track_name: Option<String>,
    pub track_view_url: Option<String>,
    pub description: Option<String>,
    pub artwork_url512: Option<String>,
    pub artwork_url100: Option<String>,
    pub artwork_url60: Option<String>,
    pub genres: Option<Vec<String>>,
    pub genre_ids: Option<Vec<String>>,
    pub primary_genre_name: Option<String>,
    pub primary_genre_id: Option<u64>,
    pub content_advisory_rating: Option<String>,
    #[serde(rename = "languageCodesISO2A")]
    pub language_codes: Option<Vec<String>>,
    pub file_size_bytes: Option<String>,
    pub minimum_os_version: Option<String>,
    pub release_date: Option<String>,
    pub current_version_release_date: Option<String>,
    pub release_notes: Option<String>,
    pub version: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub artist_id: Option<u64>,
    pub artist_name: Option<String>,
    pub artist_view_url: Option<String>,
    pub seller_url: Option<String>,
    pub average_user_rating: Option<f64>,
    pub user_rating_count: Option<u64>,
    pub average_user_rating_for_current_version: Option<f64>,
    pub user_rating_count_for_current_version: Option<u64>,
    pub screenshot_urls: Option<Vec<String>>,
    pub ipad_screenshot_urls: Option<Vec<String>>,
    pub appletv_screenshot_urls: Option<Vec<String>>,
    pub supported_devices: Option<Vec<String>>,
}

impl RawApp {
    /// Lookup results may include artists or bundles; only software is kept.
    /// Records without a wrapper type are assumed to be software.
    pub fn is_software(&self) -> bool {
        self.wrapper_type.as_deref().map_or(true, |t| t == "software")
    }
}

/// Normalized app metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: Option<u64>,
    pub app_id: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub genres: Option<Vec<String>>,
    pub genre_ids: Option<Vec<String>>,
    pub primary_genre: Option<String>,
    pub primary_genre_id: Option<u64>,
    pub content_rating: Option<String>,
    pub languages: Option<Vec<String>>,
    pub size: Option<String>,
    pub required_os_version: Option<String>,
    pub released: Option<String>,
    pub updated: Option<String>,
    pub release_notes: Option<String>,
    pub version: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    /// `None` when the record carries no price.
    pub free: Option<bool>,
    pub developer_id: Option<u64>,
    pub developer: Option<String>,
    pub developer_url: Option<String>,
    pub developer_website: Option<String>,
    pub score: Option<f64>,
    pub reviews: Option<u64>,
    pub current_version_score: Option<f64>,
    pub current_version_reviews: Option<u64>,
    pub screenshots: Option<Vec<String>>,
    pub ipad_screenshots: Option<Vec<String>>,
    pub appletv_screenshots: Option<Vec<String>>,
    pub supported_devices: Option<Vec<String>>,
}

pub fn clean_app(raw: RawApp) -> App {
    let free = raw.price.map(|price| price == 0.0);
    let icon = raw.artwork_url512.or(raw.artwork_url100).or(raw.artwork_url60);
    let updated = raw
        .current_version_release_date
        .or_else(|| raw.release_date.clone());

    App {
        id: raw.track_id,
        app_id: raw.bundle_id,
        title: raw.track_name,
        url: raw.track_view_url,
        description: raw.description,
        icon,
        genres: raw.genres,
        genre_ids: raw.genre_ids,
        primary_genre: raw.primary_genre_name,
        primary_genre_id: raw.primary_genre_id,
        content_rating: raw.content_advisory_rating,
        languages: raw.language_codes,
        size: raw.file_size_bytes,
        required_os_version: raw.minimum_os_version,
        released: raw.release_date,
        updated,
        release_notes: raw.release_notes,
        version: raw.version,
        price: raw.price,
        currency: raw.currency,
        free,
        developer_id: raw.artist_id,
        developer: raw.artist_name,
        developer_url: raw.artist_view_url,
        developer_website: raw.seller_url,
        score: raw.average_user_rating,
        reviews: raw.user_rating_count,
        current_version_score: raw.average_user_rating_for_current_version,
        current_version_reviews: raw.user_rating_count_for_current_version,
        screenshots: raw.screenshot_urls,
        ipad_screenshots: raw.ipad_screenshot_urls,
        appletv_screenshots: raw.appletv_screenshot_urls,
        supported_devices: raw.supported_devices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: &str) -> RawApp {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_maps_itunes_fields() {
        let app = clean_app(raw(
            r#"{
                "wrapperType": "software",
                "trackId": 553834731,
                "bundleId": "com.midasplayer.apps.candycrushsaga",
                "trackName": "Candy Crush Saga",
                "artworkUrl100": "https://img.test/100.jpg",
                "artworkUrl60": "https://img.test/60.jpg",
                "languageCodesISO2A": ["EN", "FR"],
                "fileSizeBytes": "312451072",
                "releaseDate": "2012-11-14T14:41:32Z",
                "currentVersionReleaseDate": "2024-05-06T09:00:00Z",
                "price": 0.0,
                "currency": "USD",
                "artistId": 526656015,
                "artistName": "King",
                "averageUserRating": 4.7,
                "userRatingCount": 3000000
            }"#,
        ));

        assert_eq!(app.id, Some(553834731));
        assert_eq!(app.app_id.as_deref(), Some("com.midasplayer.apps.candycrushsaga"));
        assert_eq!(app.icon.as_deref(), Some("https://img.test/100.jpg"));
        assert_eq!(app.languages, Some(vec!["EN".to_string(), "FR".to_string()]));
        assert_eq!(app.updated.as_deref(), Some("2024-05-06T09:00:00Z"));
        assert_eq!(app.free, Some(true));
        assert_eq!(app.developer.as_deref(), Some("King"));
        assert_eq!(app.reviews, Some(3_000_000));
    }

    #[test]
    fn test_updated_falls_back_to_released() {
        let app = clean_app(raw(r#"{"releaseDate": "2020-01-01T00:00:00Z"}"#));
        assert_eq!(app.updated.as_deref(), Some("2020-01-01T00:00:00Z"));
    }

    #[test]
    fn test_free_tracks_price() {
        assert_eq!(clean_app(raw(r#"{"price": 2.99}"#)).free, Some(false));
        assert_eq!(clean_app(raw("{}")).free, None);
    }

    #[test]
    fn test_serializes_camel_case() {
        let app = clean_app(raw(r#"{"trackId": 1, "bundleId": "a.b"}"#));
        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["appId"], "a.b");
        assert!(json.get("primaryGenreId").is_some());
    }

    #[test]
    fn test_wrapper_type_filter() {
        assert!(raw("{}").is_software());
        assert!(raw(r#"{"wrapperType": "software"}"#).is_software());
        assert!(!raw(r#"{"wrapperType": "artist"}"#).is_software());
    }
}
