use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shiori_core::models::{CatalogDetail, CatalogEntry, CatalogId, ScheduleAvailability, ScheduleSnapshot};
use shiori_core::normalize::{Passthrough, TextLocalizer};
use shiori_core::schedule::{
    bucket_week, fill_empty_thursday, sort_days, utc_offset, DEFAULT_UTC_OFFSET_MINUTES,
};
use shiori_core::view::{Section, MOVIE_LABEL};

use super::transport::{GraphQLTransport, HttpTransport, DEFAULT_ENDPOINT};
use super::types::{AniListMedia, GraphQLResponse, MediaResponse, PageResponse};
use crate::error::ApiError;
use crate::traits::{CatalogAdapter, MediaSeason, SectionStrategy};

const CARD_FIELDS: &str = r#"
            id
            title { romaji english }
            coverImage { large extraLarge }
            bannerImage
            description
            format
            status
            genres
            episodes
            averageScore
            season
            seasonYear
            nextAiringEpisode { episode airingAt }
"#;

const SEASON_QUERY: &str = r#"
query ($page: Int, $perPage: Int, $season: MediaSeason, $year: Int) {
    Page(page: $page, perPage: $perPage) {
        media(type: ANIME, season: $season, seasonYear: $year, sort: POPULARITY_DESC) {
            ...CardFields
        }
    }
}
"#;

const POPULAR_QUERY: &str = r#"
query ($page: Int, $perPage: Int) {
    Page(page: $page, perPage: $perPage) {
        media(type: ANIME, sort: POPULARITY_DESC) {
            ...CardFields
        }
    }
}
"#;

const RELEASING_QUERY: &str = r#"
query ($page: Int, $perPage: Int) {
    Page(page: $page, perPage: $perPage) {
        media(type: ANIME, status: RELEASING, sort: POPULARITY_DESC) {
            ...CardFields
        }
    }
}
"#;

const MOVIES_QUERY: &str = r#"
query ($page: Int, $perPage: Int) {
    Page(page: $page, perPage: $perPage) {
        media(type: ANIME, format: MOVIE, sort: POPULARITY_DESC) {
            ...CardFields
        }
    }
}
"#;

const TRENDING_QUERY: &str = r#"
query ($page: Int, $perPage: Int) {
    Page(page: $page, perPage: $perPage) {
        media(type: ANIME, sort: TRENDING_DESC) {
            ...CardFields
        }
    }
}
"#;

const DONGHUA_QUERY: &str = r#"
query ($page: Int, $perPage: Int) {
    Page(page: $page, perPage: $perPage) {
        media(type: ANIME, countryOfOrigin: "CN", sort: POPULARITY_DESC) {
            ...CardFields
        }
    }
}
"#;

const SEARCH_QUERY: &str = r#"
query ($search: String, $page: Int, $perPage: Int) {
    Page(page: $page, perPage: $perPage) {
        media(type: ANIME, search: $search, sort: POPULARITY_DESC) {
            ...CardFields
        }
    }
}
"#;

const MEDIA_QUERY: &str = r#"
query ($id: Int) {
    Media(id: $id, type: ANIME) {
        ...CardFields
        studios(isMain: true) { nodes { name } }
        startDate { year month day }
        endDate { year month day }
        airingSchedule { nodes { episode airingAt } }
    }
}
"#;

const SCHEDULE_QUERY: &str = r#"
query ($season: MediaSeason, $year: Int) {
    Page(perPage: 150) {
        media(type: ANIME, status: RELEASING, sort: POPULARITY_DESC, season: $season, seasonYear: $year) {
            id
            title { romaji english }
            coverImage { large extraLarge }
            nextAiringEpisode { episode airingAt }
        }
    }
}
"#;

const SCHEDULE_FALLBACK_QUERY: &str = r#"
query {
    Page(perPage: 150) {
        media(type: ANIME, status: RELEASING, sort: POPULARITY_DESC) {
            id
            title { romaji english }
            coverImage { large extraLarge }
            nextAiringEpisode { episode airingAt }
        }
    }
}
"#;

/// Appends the shared card fragment to a query that spreads it.
fn with_card_fields(query: &str) -> String {
    if query.contains("...CardFields") {
        format!("{query}\nfragment CardFields on Media {{{CARD_FIELDS}}}\n")
    } else {
        query.to_string()
    }
}

/// Tunables for the AniList adapter.
#[derive(Debug, Clone)]
pub struct AniListOptions {
    pub per_page: u32,
    pub utc_offset_minutes: i32,
    pub fill_empty_thursday: bool,
}

impl Default for AniListOptions {
    fn default() -> Self {
        Self {
            per_page: 24,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            fill_empty_thursday: true,
        }
    }
}

/// AniList GraphQL catalog adapter.
pub struct AniListClient<T = HttpTransport> {
    transport: T,
    options: AniListOptions,
    localizer: Arc<dyn TextLocalizer>,
}

impl AniListClient<HttpTransport> {
    pub fn new(endpoint: &str, options: AniListOptions) -> Self {
        let endpoint = if endpoint.trim().is_empty() {
            DEFAULT_ENDPOINT
        } else {
            endpoint
        };
        Self::with_transport(HttpTransport::new(endpoint), options)
    }
}

impl<T: GraphQLTransport> AniListClient<T> {
    pub fn with_transport(transport: T, options: AniListOptions) -> Self {
        Self {
            transport,
            options,
            localizer: Arc::new(Passthrough),
        }
    }

    /// Replace the synopsis localizer.
    pub fn with_localizer(mut self, localizer: Arc<dyn TextLocalizer>) -> Self {
        self.localizer = localizer;
        self
    }

    async fn graphql_request<R: DeserializeOwned>(
        &self,
        operation: &'static str,
        query: &str,
        variables: Value,
    ) -> Result<R, ApiError> {
        let body = json!({
            "query": with_card_fields(query),
            "variables": variables,
        });
        let raw = self.transport.post(operation, body).await?;
        let resp: GraphQLResponse<R> =
            serde_json::from_value(raw).map_err(|e| ApiError::Parse(e.to_string()))?;

        if let Some(first) = resp.errors.into_iter().next() {
            tracing::warn!(operation, message = %first.message, "AniList returned errors");
            return Err(ApiError::GraphQL(first.message));
        }
        resp.data
            .ok_or_else(|| ApiError::Parse(format!("{operation}: response carried no data")))
    }

    async fn page(
        &self,
        operation: &'static str,
        query: &str,
        variables: Value,
    ) -> Result<Vec<AniListMedia>, ApiError> {
        let resp: PageResponse = self.graphql_request(operation, query, variables).await?;
        Ok(resp.page.media)
    }

    fn to_entries(&self, media: Vec<AniListMedia>) -> Vec<CatalogEntry> {
        media
            .into_iter()
            .map(|m| m.into_entry(self.localizer.as_ref()))
            .collect()
    }

    fn paging(&self) -> Value {
        json!({ "page": 1, "perPage": self.options.per_page })
    }

    /// Section listing with the current season taken from `now`.
    pub async fn list_section_at(
        &self,
        section: Option<Section>,
        now: DateTime<Utc>,
    ) -> Result<Vec<CatalogEntry>, ApiError> {
        let (operation, query, variables) = match section {
            Some(Section::Latest) => {
                let local = now.with_timezone(&utc_offset(self.options.utc_offset_minutes));
                let mut vars = self.paging();
                vars["season"] = json!(MediaSeason::of(&local).as_str());
                vars["year"] = json!(local.year());
                ("LatestAnime", SEASON_QUERY, vars)
            }
            Some(Section::Episodes) => ("NewEpisodes", RELEASING_QUERY, self.paging()),
            Some(Section::Movies) => ("AnimeMovies", MOVIES_QUERY, self.paging()),
            Some(Section::Featured) => ("TrendingAnime", TRENDING_QUERY, self.paging()),
            Some(Section::Donghua) => ("Donghua", DONGHUA_QUERY, self.paging()),
            Some(Section::Popular) | None => ("PopularAnime", POPULAR_QUERY, self.paging()),
        };

        let mut entries = self.to_entries(self.page(operation, query, variables).await?);
        if section == Some(Section::Movies) {
            for entry in &mut entries {
                entry.episode_label = Some(MOVIE_LABEL.to_string());
            }
        }
        tracing::debug!(operation, count = entries.len(), "AniList section loaded");
        Ok(entries)
    }

    /// Weekly schedule with the current season taken from `now`.
    ///
    /// Falls back to the unfiltered releasing list when the season query
    /// leaves every weekday empty.
    pub async fn fetch_schedule_at(&self, now: DateTime<Utc>) -> Result<ScheduleSnapshot, ApiError> {
        let offset = utc_offset(self.options.utc_offset_minutes);
        let local = now.with_timezone(&offset);
        let season = MediaSeason::of(&local);
        let year = local.year();

        let media = self
            .page(
                "Schedule",
                SCHEDULE_QUERY,
                json!({ "season": season.as_str(), "year": year }),
            )
            .await?;
        let mut days = bucket_week(media.iter().filter_map(AniListMedia::to_airing), offset);
        let mut availability = ScheduleAvailability::Live;

        if days.values().all(Vec::is_empty) {
            tracing::warn!(season = %season, year, "season schedule empty, retrying without season filter");
            let media = self
                .page("ScheduleFallback", SCHEDULE_FALLBACK_QUERY, json!({}))
                .await?;
            days = bucket_week(media.iter().filter_map(AniListMedia::to_airing), offset);
            availability = ScheduleAvailability::Fallback;
        }

        if self.options.fill_empty_thursday {
            fill_empty_thursday(&mut days);
        }
        sort_days(&mut days, offset);

        Ok(ScheduleSnapshot {
            days,
            current_season: season.as_str().to_string(),
            current_year: year,
            availability,
        })
    }
}

impl<T: GraphQLTransport> CatalogAdapter for AniListClient<T> {
    fn name(&self) -> &'static str {
        "anilist"
    }

    fn section_strategy(&self) -> SectionStrategy {
        SectionStrategy::Server
    }

    async fn list_cards(&self, section: Option<Section>) -> Result<Vec<CatalogEntry>, ApiError> {
        self.list_section_at(section, Utc::now()).await
    }

    async fn fetch_by_id(&self, id: &CatalogId) -> Result<CatalogDetail, ApiError> {
        let numeric: u64 = id
            .as_str()
            .parse()
            .map_err(|_| ApiError::NotFound(id.clone()))?;

        let resp: MediaResponse = match self
            .graphql_request("GetAnime", MEDIA_QUERY, json!({ "id": numeric }))
            .await
        {
            Ok(resp) => resp,
            Err(ApiError::Api { status: 404, .. }) => return Err(ApiError::NotFound(id.clone())),
            Err(e) => return Err(e),
        };
        let media = resp.media.ok_or_else(|| ApiError::NotFound(id.clone()))?;

        let episodes = media.scheduled_episodes();
        Ok(CatalogDetail {
            entry: media.into_entry(self.localizer.as_ref()),
            episodes,
            subtitle_packs: Vec::new(),
        })
    }

    async fn fetch_schedule(&self) -> Result<ScheduleSnapshot, ApiError> {
        self.fetch_schedule_at(Utc::now()).await
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>, ApiError> {
        let mut vars = self.paging();
        vars["search"] = json!(query.trim());
        let media = self.page("Search", SEARCH_QUERY, vars).await?;
        Ok(self.to_entries(media))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeZone;
    use shiori_core::models::Weekday;

    use super::*;

    /// Replays canned responses in order and records each request.
    struct FakeTransport {
        responses: Mutex<Vec<Result<Value, ApiError>>>,
        requests: Mutex<Vec<(&'static str, Value)>>,
    }

    impl FakeTransport {
        fn new(responses: Vec<Result<Value, ApiError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn operations(&self) -> Vec<&'static str> {
            self.requests.lock().unwrap().iter().map(|(op, _)| *op).collect()
        }

        fn variables(&self, index: usize) -> Value {
            self.requests.lock().unwrap()[index].1["variables"].clone()
        }
    }

    impl GraphQLTransport for FakeTransport {
        async fn post(&self, operation: &'static str, body: Value) -> Result<Value, ApiError> {
            self.requests.lock().unwrap().push((operation, body));
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                panic!("unexpected request: {operation}");
            }
            responses.remove(0)
        }
    }

    fn page(media: Value) -> Result<Value, ApiError> {
        Ok(json!({ "data": { "Page": { "media": media } } }))
    }

    fn client(responses: Vec<Result<Value, ApiError>>) -> AniListClient<FakeTransport> {
        AniListClient::with_transport(
            FakeTransport::new(responses),
            AniListOptions {
                utc_offset_minutes: 0,
                fill_empty_thursday: false,
                ..Default::default()
            },
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
    }

    // 2024-01-06 00:00:00 UTC, a Saturday.
    const SATURDAY_UTC: i64 = 1_704_499_200;

    fn airing_media(id: u64, airing_at: i64) -> Value {
        json!({
            "id": id,
            "title": { "romaji": format!("Show {id}") },
            "coverImage": { "large": "l.jpg" },
            "nextAiringEpisode": { "episode": 4, "airingAt": airing_at }
        })
    }

    #[tokio::test]
    async fn test_schedule_uses_season_query() {
        let api = client(vec![page(json!([
            airing_media(1, SATURDAY_UTC + 3600),
            { "id": 2, "title": { "romaji": "No airing" } }
        ]))]);

        let snapshot = api.fetch_schedule_at(now()).await.unwrap();
        assert_eq!(api.transport.operations(), vec!["Schedule"]);
        assert_eq!(api.transport.variables(0)["season"], "WINTER");
        assert_eq!(api.transport.variables(0)["year"], 2024);
        assert_eq!(snapshot.availability, ScheduleAvailability::Live);
        assert_eq!(snapshot.total(), 1);
        assert_eq!(snapshot.day(Weekday::Saturday)[0].episode, "قسمت ۴");
        assert_eq!(snapshot.current_season, "WINTER");
    }

    #[tokio::test]
    async fn test_schedule_falls_back_when_season_is_empty() {
        let api = client(vec![
            page(json!([])),
            page(json!([
                airing_media(7, SATURDAY_UTC + 2 * 86_400),
                airing_media(8, SATURDAY_UTC + 3600)
            ])),
        ]);

        let snapshot = api.fetch_schedule_at(now()).await.unwrap();
        assert_eq!(api.transport.operations(), vec!["Schedule", "ScheduleFallback"]);
        assert_eq!(snapshot.availability, ScheduleAvailability::Fallback);
        assert_eq!(snapshot.total(), 2);
        assert_eq!(snapshot.day(Weekday::Monday)[0].id, CatalogId::from(7_i64));
    }

    #[tokio::test]
    async fn test_graphql_errors_surface_first_message() {
        let api = client(vec![Ok(json!({
            "data": null,
            "errors": [{ "message": "Too Many Requests." }, { "message": "other" }]
        }))]);
        let err = api.list_cards(Some(Section::Popular)).await.unwrap_err();
        assert!(matches!(err, ApiError::GraphQL(msg) if msg == "Too Many Requests."));
    }

    #[tokio::test]
    async fn test_fetch_by_id_maps_missing_media_to_not_found() {
        let api = client(vec![Err(ApiError::Api {
            status: 404,
            message: "Not Found.".into(),
        })]);
        let err = api.fetch_by_id(&CatalogId::from(999_i64)).await.unwrap_err();
        assert!(err.is_not_found());

        let api = client(vec![]);
        let err = api.fetch_by_id(&CatalogId::from("abc")).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(api.transport.operations().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_by_id_synthesizes_episodes_from_schedule() {
        let api = client(vec![Ok(json!({ "data": { "Media": {
            "id": 21,
            "title": { "english": "One Piece" },
            "studios": { "nodes": [{ "name": "Toei Animation" }] },
            "airingSchedule": { "nodes": [
                { "episode": 1, "airingAt": 1 },
                { "episode": 2, "airingAt": 2 }
            ]}
        }}}))]);

        let detail = api.fetch_by_id(&CatalogId::from(21_i64)).await.unwrap();
        assert_eq!(detail.entry.title, "One Piece");
        assert_eq!(detail.entry.studio.as_deref(), Some("Toei Animation"));
        assert_eq!(detail.episodes.len(), 2);
        assert!(detail.subtitle_packs.is_empty());
    }

    #[tokio::test]
    async fn test_latest_uses_current_season_and_movies_get_label() {
        let api = client(vec![
            page(json!([{ "id": 1, "title": { "romaji": "A" } }])),
            page(json!([{ "id": 2, "title": { "romaji": "B" }, "format": "MOVIE" }])),
        ]);

        let summer = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
        api.list_section_at(Some(Section::Latest), summer).await.unwrap();
        assert_eq!(api.transport.variables(0)["season"], "SUMMER");
        assert_eq!(api.transport.variables(0)["year"], 2025);

        let movies = api.list_section_at(Some(Section::Movies), summer).await.unwrap();
        assert_eq!(movies[0].episode_label.as_deref(), Some(MOVIE_LABEL));
        assert_eq!(api.transport.operations(), vec!["LatestAnime", "AnimeMovies"]);
    }

    #[test]
    fn test_card_fragment_is_appended_once() {
        let query = with_card_fields(POPULAR_QUERY);
        assert!(query.contains("fragment CardFields on Media"));
        assert_eq!(with_card_fields(SCHEDULE_QUERY), SCHEDULE_QUERY);
    }
}
