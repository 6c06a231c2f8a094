use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::{
    client::{ApiClient, ApiRequest},
    error::RequestError,
    model::{Coordinates, Place},
};

use super::Geocoder;

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: ApiClient,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self, RequestError> {
        Ok(Self {
            client: ApiClient::new(base_url, timeout, user_agent)?,
        })
    }
}

/// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct NmPlace {
    lat: String,
    lon: String,
    display_name: String,
}

/// Unresolvable points come back as `200 {"error": "Unable to geocode"}`.
#[derive(Debug, Deserialize)]
struct NmReverse {
    display_name: Option<String>,
}

impl TryFrom<NmPlace> for Place {
    type Error = RequestError;

    fn try_from(p: NmPlace) -> Result<Self, Self::Error> {
        let parse = |field: &str, value: &str| {
            value.trim().parse::<f64>().map_err(|_| {
                RequestError::Decode(format!("Nominatim `{field}` is not a number: {value}"))
            })
        };

        Ok(Place {
            coordinates: Coordinates::new(parse("lat", &p.lat)?, parse("lon", &p.lon)?),
            display_name: p.display_name,
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn search(&self, query: &str) -> Result<Option<Place>, RequestError> {
        let request = ApiRequest::get("search")
            .query("q", query)
            .query("format", "json")
            .query("limit", "1");

        let places: Vec<NmPlace> = self.client.send_json(request).await?;
        places.into_iter().next().map(Place::try_from).transpose()
    }

    async fn reverse(&self, coordinates: Coordinates) -> Result<Option<String>, RequestError> {
        let request = ApiRequest::get("reverse")
            .query("lat", coordinates.latitude.to_string())
            .query("lon", coordinates.longitude.to_string())
            .query("format", "json");

        let parsed: NmReverse = self.client.send_json(request).await?;
        Ok(parsed.display_name.filter(|n| !n.is_empty()))
    }
}
