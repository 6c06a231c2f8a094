//! Core library for the `agridrone` CLI.
//!
//! This crate defines:
//! - Configuration handling
//! - A single-attempt async HTTP client with typed failures
//! - The backend and geocoder seams (`AgriApi`, `Geocoder`, `LocationSource`)
//! - Session state for the assistant chat, the farm/weather dashboard,
//!   the location picker and crop disease prediction
//!
//! It is used by `agridrone-cli`, but the sessions are plain structs and can
//! sit behind any other front-end.

pub mod api;
pub mod chat;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod geocoder;
pub mod location;
pub mod model;
pub mod prediction;

#[cfg(test)]
mod testing;

pub use api::{AgriApi, HttpApi, api_from_config};
pub use chat::ChatSession;
pub use client::{ApiClient, ApiRequest};
pub use config::Config;
pub use dashboard::{DashboardError, Deletion, FarmDashboard, FarmForm};
pub use error::{RequestError, ValidationError};
pub use geocoder::{Geocoder, geocoder_from_config};
pub use location::{LocationNotice, LocationPicker, LocationSource, PickedLocation, location_source_from_config};
pub use model::{
    Coordinates, Crop, Farm, FarmId, Message, PredictionResult, Role, WeatherSnapshot,
};
pub use prediction::{ImageFile, PredictionSession, PredictionView};
