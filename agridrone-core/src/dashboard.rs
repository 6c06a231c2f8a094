//! Farm list, crop list, weather view and farm form.
//!
//! The backend owns farms; after every create or delete the list is refetched
//! rather than patched locally.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    api::AgriApi,
    error::{RequestError, ValidationError},
    location::PickedLocation,
    model::{Crop, CropId, Farm, FarmId, NewFarm, WeatherSnapshot},
};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this farm?";

/// Alert-level failure of a dashboard operation.
#[derive(Debug, Clone, Error)]
pub enum DashboardError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to create farm")]
    CreateFailed(#[source] RequestError),

    #[error("Failed to delete farm")]
    DeleteFailed(#[source] RequestError),

    #[error("Failed to fetch weather data")]
    WeatherFailed(#[source] RequestError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    Cancelled,
}

/// Create-farm form. Coordinates and name come from the location picker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FarmForm {
    pub name: String,
    pub location_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub crop: Option<CropId>,
}

impl FarmForm {
    pub fn apply_location(&mut self, picked: &PickedLocation) {
        self.latitude = Some(picked.coordinates.latitude);
        self.longitude = Some(picked.coordinates.longitude);
        self.location_name = picked.location_name.clone();
    }

    pub fn validate(&self) -> Result<NewFarm, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingFarmName);
        }

        let crop = self.crop.ok_or(ValidationError::MissingCrop)?;

        let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) else {
            return Err(ValidationError::MissingLocation);
        };

        Ok(NewFarm {
            name: name.to_string(),
            location_name: self.location_name.clone(),
            latitude,
            longitude,
            crop,
        })
    }
}

#[derive(Debug)]
pub struct FarmDashboard {
    api: Arc<dyn AgriApi>,
    farms: Vec<Farm>,
    crops: Vec<Crop>,
    selected: Option<FarmId>,
    weather: Option<WeatherSnapshot>,
    loading: bool,
    mutating: bool,
    show_create_form: bool,
    form: FarmForm,
}

impl FarmDashboard {
    pub fn new(api: Arc<dyn AgriApi>) -> Self {
        Self {
            api,
            farms: Vec::new(),
            crops: Vec::new(),
            selected: None,
            weather: None,
            loading: false,
            mutating: false,
            show_create_form: false,
            form: FarmForm::default(),
        }
    }

    pub fn farms(&self) -> &[Farm] {
        &self.farms
    }

    pub fn farm(&self, id: FarmId) -> Option<&Farm> {
        self.farms.iter().find(|f| f.id == id)
    }

    pub fn crops(&self) -> &[Crop] {
        &self.crops
    }

    pub fn selected_farm(&self) -> Option<FarmId> {
        self.selected
    }

    pub fn weather(&self) -> Option<&WeatherSnapshot> {
        self.weather.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_mutating(&self) -> bool {
        self.mutating
    }

    pub fn is_create_form_open(&self) -> bool {
        self.show_create_form
    }

    pub fn toggle_create_form(&mut self) {
        self.show_create_form = !self.show_create_form;
    }

    pub fn close_create_form(&mut self) {
        self.show_create_form = false;
    }

    pub fn form(&self) -> &FarmForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FarmForm {
        &mut self.form
    }

    /// Initial sync: farms and crops. Failures leave the previous lists.
    pub async fn load(&mut self) {
        // already logged
        self.load_farms().await.ok();
        self.load_crops().await.ok();
    }

    pub async fn load_farms(&mut self) -> Result<(), RequestError> {
        match self.api.list_farms().await {
            Ok(farms) => {
                self.farms = farms;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "error fetching farms");
                Err(err)
            }
        }
    }

    pub async fn load_crops(&mut self) -> Result<(), RequestError> {
        match self.api.list_crops().await {
            Ok(crops) => {
                self.crops = crops;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "error fetching crops");
                Err(err)
            }
        }
    }

    pub async fn create_farm(&mut self) -> Result<(), DashboardError> {
        if self.mutating {
            return Err(ValidationError::RequestPending.into());
        }

        let new_farm = self.form.validate()?;

        self.mutating = true;
        let result = self.api.create_farm(&new_farm).await;
        self.mutating = false;

        match result {
            Ok(()) => {
                info!(name = %new_farm.name, crop = new_farm.crop, "farm created");
                self.show_create_form = false;
                self.form = FarmForm::default();
                // already logged
                self.load_farms().await.ok();
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "error creating farm");
                Err(DashboardError::CreateFailed(err))
            }
        }
    }

    pub async fn fetch_weather(&mut self, farm_id: FarmId) -> Result<(), DashboardError> {
        self.loading = true;
        let result = self.api.farm_weather(farm_id).await;
        self.loading = false;

        match result {
            Ok(snapshot) => {
                self.weather = Some(snapshot);
                self.selected = Some(farm_id);
                Ok(())
            }
            Err(err) => {
                warn!(farm_id, error = %err, "error fetching weather");
                Err(DashboardError::WeatherFailed(err))
            }
        }
    }

    /// Delete after `confirm` approves [`DELETE_PROMPT`].
    pub async fn delete_farm(
        &mut self,
        farm_id: FarmId,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<Deletion, DashboardError> {
        if self.mutating {
            return Err(ValidationError::RequestPending.into());
        }

        if !confirm(DELETE_PROMPT) {
            return Ok(Deletion::Cancelled);
        }

        self.mutating = true;
        let result = self.api.delete_farm(farm_id).await;
        self.mutating = false;

        if let Err(err) = result {
            warn!(farm_id, error = %err, "error deleting farm");
            return Err(DashboardError::DeleteFailed(err));
        }

        info!(farm_id, "farm deleted");
        // already logged
        self.load_farms().await.ok();
        if self.selected == Some(farm_id) {
            self.selected = None;
            self.weather = None;
        }

        Ok(Deletion::Deleted)
    }
}
