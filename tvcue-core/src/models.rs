use std::fmt;

use chrono::NaiveTime;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ShowId(u32);

impl ShowId {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "show#{}", self.0)
    }
}

impl From<u32> for ShowId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct EpisodeId(u32);

impl EpisodeId {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "episode#{}", self.0)
    }
}

impl From<u32> for EpisodeId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// A scheduled episode, normalized from a catalog payload.
///
/// Deserialization never fails because of absent optional fields.  Defaults
/// are substituted here so that code downstream never has to re-check them.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(from = "RawEpisode")]
pub struct Episode {
    pub id: EpisodeId,
    pub name: String,
    pub season: u32,
    pub number: u32,
    /// Local airtime in `HH:MM`.  `None` means to be announced.
    pub airtime: Option<String>,
    pub show: Show,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(from = "RawShow")]
pub struct Show {
    pub id: ShowId,
    pub name: String,
    pub image: Option<Image>,
    pub network: Option<Network>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Image {
    #[serde(default, deserialize_with = "lenient")]
    pub medium: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub original: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(from = "RawNetwork")]
pub struct Network {
    pub name: String,
    pub country_code: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SearchHit {
    #[serde(default, deserialize_with = "lenient")]
    pub score: f64,
    #[serde(default, deserialize_with = "lenient")]
    pub show: Show,
}

// raw shapes

#[derive(Deserialize)]
struct RawEpisode {
    #[serde(default, deserialize_with = "lenient")]
    id: EpisodeId,
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    season: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    number: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    airtime: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    show: Option<Show>,
    // Entries of the web-wide schedule carry the show here instead.
    #[serde(default, rename = "_embedded", deserialize_with = "lenient")]
    embedded: Option<RawEmbedded>,
}

#[derive(Deserialize)]
struct RawEmbedded {
    #[serde(default, deserialize_with = "lenient")]
    show: Option<Show>,
}

impl From<RawEpisode> for Episode {
    fn from(raw: RawEpisode) -> Self {
        let show = raw
            .show
            .or_else(|| raw.embedded.and_then(|embedded| embedded.show))
            .unwrap_or_default();
        Episode {
            id: raw.id,
            name: raw.name.unwrap_or_default(),
            season: raw.season.unwrap_or_default(),
            number: raw.number.unwrap_or_default(),
            airtime: raw.airtime.as_deref().and_then(normalize_airtime),
            show,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawShow {
    #[serde(default, deserialize_with = "lenient")]
    id: ShowId,
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    image: Option<Image>,
    #[serde(default, deserialize_with = "lenient")]
    network: Option<Network>,
    #[serde(default, deserialize_with = "lenient")]
    web_channel: Option<Network>,
}

impl From<RawShow> for Show {
    fn from(raw: RawShow) -> Self {
        Show {
            id: raw.id,
            name: raw.name.unwrap_or_default(),
            image: raw.image,
            network: raw.network.or(raw.web_channel),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNetwork {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    country: Option<RawCountry>,
    // Present when a serialized `Network` is read back.
    #[serde(default, rename = "country_code", deserialize_with = "lenient")]
    country_code: Option<String>,
}

#[derive(Deserialize)]
struct RawCountry {
    #[serde(default, deserialize_with = "lenient")]
    code: Option<String>,
}

impl From<RawNetwork> for Network {
    fn from(raw: RawNetwork) -> Self {
        Network {
            name: raw.name.unwrap_or_default(),
            country_code: raw
                .country
                .and_then(|country| country.code)
                .or(raw.country_code),
        }
    }
}

// A field of an unexpected type is treated as absent, so that one odd entry
// never fails the whole payload.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match serde_json::from_value(value) {
        Ok(value) => Ok(value),
        Err(err) => {
            tracing::debug!(%err, "Unexpected field value, treated as absent");
            Ok(T::default())
        }
    }
}

fn normalize_airtime(airtime: &str) -> Option<String> {
    let airtime = airtime.trim();
    if airtime.is_empty() {
        return None;
    }
    match NaiveTime::parse_from_str(airtime, "%H:%M") {
        Ok(time) => Some(time.format("%H:%M").to_string()),
        Err(_) => {
            tracing::debug!(airtime, "Unparsable airtime, treated as TBA");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_episode_full() {
        let episode: Episode = serde_json::from_value(json!({
            "id": 10,
            "name": "Pilot",
            "season": 1,
            "number": 1,
            "airtime": "20:00",
            "show": {
                "id": 1,
                "name": "Show",
                "image": { "medium": "m.jpg", "original": "o.jpg" },
                "network": { "id": 2, "name": "NBC", "country": { "code": "US" } },
            },
        }))
        .unwrap();
        assert_eq!(episode.id, 10.into());
        assert_eq!(episode.name, "Pilot");
        assert_eq!(episode.airtime.as_deref(), Some("20:00"));
        assert_eq!(episode.show.id, 1.into());
        assert_eq!(
            episode.show.network,
            Some(Network {
                name: "NBC".to_string(),
                country_code: Some("US".to_string()),
            })
        );
    }

    #[test]
    fn test_episode_missing_fields() {
        let episode: Episode = serde_json::from_value(json!({ "id": 3 })).unwrap();
        assert_eq!(episode.name, "");
        assert_eq!(episode.season, 0);
        assert_eq!(episode.number, 0);
        assert_eq!(episode.airtime, None);
        assert_eq!(episode.show, Show::default());

        let episode: Episode = serde_json::from_value(json!({
            "id": 3,
            "number": null,
            "airtime": "",
            "show": { "id": 5 },
        }))
        .unwrap();
        assert_eq!(episode.number, 0);
        assert_eq!(episode.airtime, None);
        assert_eq!(episode.show.id, 5.into());
        assert_eq!(episode.show.image, None);
        assert_eq!(episode.show.network, None);
    }

    #[test]
    fn test_episode_embedded_show() {
        let episode: Episode = serde_json::from_value(json!({
            "id": 7,
            "airtime": "9:05",
            "_embedded": {
                "show": {
                    "id": 8,
                    "name": "Web Show",
                    "network": null,
                    "webChannel": { "name": "Netflix", "country": null },
                },
            },
        }))
        .unwrap();
        assert_eq!(episode.airtime.as_deref(), Some("09:05"));
        assert_eq!(episode.show.id, 8.into());
        assert_eq!(
            episode.show.network,
            Some(Network {
                name: "Netflix".to_string(),
                country_code: None,
            })
        );
    }

    #[test]
    fn test_episode_bad_airtime() {
        let episode: Episode =
            serde_json::from_value(json!({ "id": 1, "airtime": "soon" })).unwrap();
        assert_eq!(episode.airtime, None);
    }

    #[test]
    fn test_episode_wrong_types() {
        let episodes: Vec<Episode> = serde_json::from_value(json!([
            { "id": 1, "airtime": "20:00", "show": { "id": 1, "name": "Show" } },
            { "id": 2, "show": { "id": null, "name": 5 } },
            { "id": null, "season": "1", "number": -1, "airtime": 2030, "show": "none" },
            { "id": 4, "_embedded": [], "show": { "id": 4, "network": "NBC", "image": 1 } },
        ]))
        .unwrap();
        assert_eq!(episodes.len(), 4);
        assert_eq!(episodes[0].show.name, "Show");
        assert_eq!(episodes[1].show.id, ShowId::default());
        assert_eq!(episodes[1].show.name, "");
        assert_eq!(episodes[2].id, EpisodeId::default());
        assert_eq!(episodes[2].season, 0);
        assert_eq!(episodes[2].number, 0);
        assert_eq!(episodes[2].airtime, None);
        assert_eq!(episodes[2].show, Show::default());
        assert_eq!(episodes[3].show.id, 4.into());
        assert_eq!(episodes[3].show.network, None);
        assert_eq!(episodes[3].show.image, None);
    }

    #[test]
    fn test_episode_reserialize() {
        let episode: Episode = serde_json::from_value(json!({
            "id": 1,
            "airtime": "20:00",
            "show": {
                "id": 2,
                "name": "Show",
                "network": { "name": "ABC", "country": { "code": "US" } },
            },
        }))
        .unwrap();
        let value = serde_json::to_value(&episode).unwrap();
        assert_eq!(serde_json::from_value::<Episode>(value).unwrap(), episode);
    }

    #[test]
    fn test_search_hit() {
        let hits: Vec<SearchHit> = serde_json::from_value(json!([
            { "score": 0.9, "show": { "id": 1, "name": "Girls" } },
            { "show": { "id": 2 } },
            { "score": null },
        ]))
        .unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].show.name, "Girls");
        assert_eq!(hits[1].score, 0.0);
        assert_eq!(hits[2].show, Show::default());
    }
}
