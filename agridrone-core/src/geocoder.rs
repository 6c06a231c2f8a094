use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    Config,
    error::RequestError,
    geocoder::nominatim::NominatimGeocoder,
    model::{Coordinates, Place},
};

pub mod nominatim;

/// Forward and reverse geocoding. An empty match is `Ok(None)`, not an error.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// First match for a free-text query.
    async fn search(&self, query: &str) -> Result<Option<Place>, RequestError>;

    /// Human-readable name for a point.
    async fn reverse(&self, coordinates: Coordinates) -> Result<Option<String>, RequestError>;
}

/// Construct the geocoder from config.
pub fn geocoder_from_config(config: &Config) -> Result<NominatimGeocoder, RequestError> {
    NominatimGeocoder::new(&config.geocoder_url, config.request_timeout(), &config.user_agent)
}
