//! Where the user is, and where they point.
//!
//! [`LocationSource`] stands in for device geolocation: one best-effort
//! answer, silence on failure. [`LocationPicker`] is the map selector state:
//! a single current point whose name comes from the geocoder.

use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    Config,
    geocoder::Geocoder,
    model::{Coordinates, Place},
};

/// Map centre before anything is picked (Mumbai).
pub const DEFAULT_CENTRE: Coordinates = Coordinates {
    latitude: 19.0760,
    longitude: 72.8777,
};

#[async_trait]
pub trait LocationSource: Send + Sync + Debug {
    /// `None` when access is denied or no fix is available.
    async fn current_position(&self) -> Option<Coordinates>;
}

#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationSource for FixedLocation {
    async fn current_position(&self) -> Option<Coordinates> {
        Some(self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationSource for NoLocation {
    async fn current_position(&self) -> Option<Coordinates> {
        None
    }
}

pub fn location_source_from_config(config: &Config) -> Box<dyn LocationSource> {
    match config.location {
        Some(coords) => Box::new(FixedLocation(coords)),
        None => Box::new(NoLocation),
    }
}

/// User-visible notice from the picker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationNotice {
    #[error("Location not found")]
    NotFound,

    #[error("Error searching location")]
    SearchFailed,

    #[error("Error getting location name")]
    ReverseFailed,
}

/// A point with a resolved name, ready for the farm form.
#[derive(Debug, Clone, PartialEq)]
pub struct PickedLocation {
    pub coordinates: Coordinates,
    pub location_name: String,
}

#[derive(Debug)]
pub struct LocationPicker {
    geocoder: Arc<dyn Geocoder>,
    point: Coordinates,
    name: Option<String>,
}

impl LocationPicker {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self::centred_on(geocoder, DEFAULT_CENTRE)
    }

    pub fn centred_on(geocoder: Arc<dyn Geocoder>, centre: Coordinates) -> Self {
        Self {
            geocoder,
            point: centre,
            name: None,
        }
    }

    pub fn point(&self) -> Coordinates {
        self.point
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Available once both the point and its name are known.
    pub fn selection(&self) -> Option<PickedLocation> {
        self.name.as_ref().map(|name| PickedLocation {
            coordinates: self.point,
            location_name: name.clone(),
        })
    }

    /// Map click: the point moves immediately, the name follows from reverse geocoding.
    pub async fn pick_point(&mut self, coordinates: Coordinates) -> Result<(), LocationNotice> {
        self.point = coordinates;
        self.name = None;

        match self.geocoder.reverse(coordinates).await {
            Ok(Some(name)) => {
                debug!(%name, "reverse geocoded picked point");
                self.name = Some(name);
                Ok(())
            }
            Ok(None) => {
                debug!(latitude = coordinates.latitude, longitude = coordinates.longitude, "no name for picked point");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "error getting location name");
                Err(LocationNotice::ReverseFailed)
            }
        }
    }

    /// Jump to the first match for `query`. Blank queries do nothing.
    pub async fn search(&mut self, query: &str) -> Result<(), LocationNotice> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(());
        }

        match self.geocoder.search(query).await {
            Ok(Some(Place { coordinates, display_name })) => {
                self.point = coordinates;
                self.name = Some(display_name);
                Ok(())
            }
            Ok(None) => Err(LocationNotice::NotFound),
            Err(err) => {
                warn!(%query, error = %err, "error searching location");
                Err(LocationNotice::SearchFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::RequestError, testing::FakeGeocoder};

    fn pune() -> Place {
        Place {
            coordinates: Coordinates::new(18.5204, 73.8567),
            display_name: "Pune, Maharashtra, India".into(),
        }
    }

    #[test]
    fn picker_starts_at_default_centre_without_selection() {
        let geo = Arc::new(FakeGeocoder::new(Ok(None), Ok(None)));
        let picker = LocationPicker::new(geo);
        assert_eq!(picker.point(), DEFAULT_CENTRE);
        assert_eq!(picker.selection(), None);
    }

    #[tokio::test]
    async fn search_hit_moves_point_and_names_it() {
        let geo = Arc::new(FakeGeocoder::new(Ok(Some(pune())), Ok(None)));
        let mut picker = LocationPicker::new(geo);

        picker.search("Pune").await.unwrap();

        assert_eq!(
            picker.selection(),
            Some(PickedLocation {
                coordinates: Coordinates::new(18.5204, 73.8567),
                location_name: "Pune, Maharashtra, India".into(),
            })
        );
    }

    #[tokio::test]
    async fn search_miss_is_not_found_and_keeps_selection() {
        let geo = Arc::new(FakeGeocoder::new(Ok(Some(pune())), Ok(None)));
        let mut picker = LocationPicker::new(geo.clone());
        picker.search("Pune").await.unwrap();

        *geo.search.lock().unwrap() = Ok(None);
        assert_eq!(picker.search("Atlantis").await, Err(LocationNotice::NotFound));
        assert_eq!(picker.name(), Some("Pune, Maharashtra, India"));
    }

    #[tokio::test]
    async fn search_transport_failure_is_generic_notice() {
        let geo = Arc::new(FakeGeocoder::new(Err(RequestError::transport("offline")), Ok(None)));
        let mut picker = LocationPicker::new(geo);
        assert_eq!(picker.search("Pune").await, Err(LocationNotice::SearchFailed));
        assert_eq!(picker.point(), DEFAULT_CENTRE);
    }

    #[tokio::test]
    async fn blank_search_makes_no_call() {
        let geo = Arc::new(FakeGeocoder::new(Ok(Some(pune())), Ok(None)));
        let mut picker = LocationPicker::new(geo.clone());
        picker.search("   ").await.unwrap();
        assert_eq!(geo.call_count(), 0);
    }

    #[tokio::test]
    async fn new_point_supersedes_previous_selection() {
        let geo = Arc::new(FakeGeocoder::new(Ok(Some(pune())), Ok(Some("Lonavala, India".into()))));
        let mut picker = LocationPicker::new(geo.clone());
        picker.search("Pune").await.unwrap();

        picker.pick_point(Coordinates::new(18.75, 73.4)).await.unwrap();
        assert_eq!(picker.selection().unwrap().location_name, "Lonavala, India");
        assert_eq!(picker.point(), Coordinates::new(18.75, 73.4));

        *geo.reverse.lock().unwrap() = Err(RequestError::transport("offline"));
        let res = picker.pick_point(Coordinates::new(10.0, 10.0)).await;
        assert_eq!(res, Err(LocationNotice::ReverseFailed));
        assert_eq!(picker.point(), Coordinates::new(10.0, 10.0));
        assert_eq!(picker.selection(), None);
    }

    #[tokio::test]
    async fn config_location_feeds_source() {
        let mut cfg = Config::default();
        assert_eq!(location_source_from_config(&cfg).current_position().await, None);

        cfg.set_location(Coordinates::new(1.0, 2.0));
        assert_eq!(
            location_source_from_config(&cfg).current_position().await,
            Some(Coordinates::new(1.0, 2.0))
        );
    }
}
