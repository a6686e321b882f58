use log::{debug, warn};
use reqwest::{
    blocking::Client,
    header::{HeaderMap, HeaderValue, USER_AGENT},
    StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{error::GeocodeError, form::FormField, location::Position, Cache};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressHint {
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

impl AddressHint {
    pub fn get(&self, field: FormField) -> Option<&str> {
        match field {
            FormField::City => self.city.as_deref(),
            FormField::State => self.state.as_deref(),
            FormField::Zip => self.zip.as_deref(),
            _ => None,
        }
    }
}

pub trait ReverseGeocoder {
    /// Looks up the single best address candidate for `position`.
    /// `Ok(None)` means the service answered but knows no address there.
    fn reverse_geocode(&self, position: &Position) -> Result<Option<AddressHint>, GeocodeError>;
}

/// OpenStreetMap Nominatim reverse geocoding, optionally backed by an
/// on-disk response cache.
pub struct Nominatim {
    client: Client,
    endpoint: String,
    user_agent: String,
    cache: Option<Cache>,
}

impl Nominatim {
    pub const DEFAULT_ENDPOINT: &'static str = "https://nominatim.openstreetmap.org/reverse";

    pub fn new(user_agent: &str) -> Nominatim {
        Nominatim {
            client: Client::new(),
            endpoint: Nominatim::DEFAULT_ENDPOINT.to_string(),
            user_agent: user_agent.to_string(),
            cache: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Nominatim {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_cache(mut self, cache: Cache) -> Nominatim {
        self.cache = Some(cache);
        self
    }

    fn cached(&self, key: &str) -> Option<Value> {
        let cache = self.cache.as_ref()?;
        match cache.read(key) {
            Ok(hit) => hit,
            Err(e) => {
                warn!("Ignoring geocode cache entry: {}", e);
                None
            }
        }
    }

    fn store(&self, key: &str, json: &Value) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.write(key, json) {
                warn!("Could not cache geocode response: {}", e);
            }
        }
    }

    fn request_api(&self, position: &Position) -> Result<Value, GeocodeError> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&self.user_agent)
            .map_err(|e| GeocodeError::Malformed(format!("user agent: {}", e)))?;
        headers.insert(USER_AGENT, agent);

        let lat = position.lat.to_string();
        let lon = position.lon.to_string();
        let params = [
            ("format", "jsonv2"),
            ("addressdetails", "1"),
            ("lat", lat.as_str()),
            ("lon", lon.as_str()),
        ];
        let url = reqwest::Url::parse_with_params(&self.endpoint, &params)
            .map_err(|e| GeocodeError::Malformed(format!("endpoint {}: {}", self.endpoint, e)))?;

        let res = self.client.get(url).headers(headers).send()?;
        check_status(res.status())?;
        Ok(res.json::<Value>()?)
    }
}

impl ReverseGeocoder for Nominatim {
    fn reverse_geocode(&self, position: &Position) -> Result<Option<AddressHint>, GeocodeError> {
        let key = cache_key(position);
        let res_json = match self.cached(&key) {
            Some(res_json) => res_json,
            None => {
                debug!("Geocode cache miss for {}", key);
                let res_json = self.request_api(position)?;
                if res_json.get("error").is_none() {
                    self.store(&key, &res_json);
                }
                res_json
            }
        };
        Ok(json_to_hint(&res_json))
    }
}

fn check_status(status: StatusCode) -> Result<(), GeocodeError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(GeocodeError::Status(status))
    }
}

// Three decimals is roughly 100 m, finer than the distance filter.
fn cache_key(position: &Position) -> String {
    format!("{:.3},{:.3}", position.lat, position.lon)
}

fn json_to_hint(json_response: &Value) -> Option<AddressHint> {
    if json_response.get("error").is_some() {
        return None;
    }
    let address = json_response.get("address")?.as_object()?;
    let text = |key: &str| address.get(key).and_then(Value::as_str).map(str::to_string);

    let city = ["city", "town", "village", "hamlet", "municipality"]
        .iter()
        .find_map(|key| text(*key));
    let state = text("ISO3166-2-lvl4")
        .and_then(|code| code.split_once('-').map(|(_, region)| region.to_string()))
        .or_else(|| text("state"));
    let zip = text("postcode");

    Some(AddressHint { city, state, zip })
}
