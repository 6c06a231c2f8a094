use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    Config,
    client::{ApiClient, ApiRequest},
    error::RequestError,
    model::{ChatReply, ChatRequest, Crop, Farm, FarmId, NewFarm, PredictionResult, WeatherSnapshot},
    prediction::ImageFile,
};

/// Backend operations the sessions depend on.
#[async_trait]
pub trait AgriApi: Send + Sync + Debug {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, RequestError>;

    async fn predict(&self, image: &ImageFile) -> Result<PredictionResult, RequestError>;

    async fn list_farms(&self) -> Result<Vec<Farm>, RequestError>;

    async fn create_farm(&self, farm: &NewFarm) -> Result<(), RequestError>;

    async fn delete_farm(&self, id: FarmId) -> Result<(), RequestError>;

    async fn farm_weather(&self, id: FarmId) -> Result<WeatherSnapshot, RequestError>;

    async fn list_crops(&self) -> Result<Vec<Crop>, RequestError>;
}

/// [`AgriApi`] over the backend's JSON/multipart HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: ApiClient,
}

impl HttpApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

/// Construct the backend client from config.
pub fn api_from_config(config: &Config) -> Result<HttpApi, RequestError> {
    let client = ApiClient::new(&config.api_base_url, config.request_timeout(), &config.user_agent)?;
    Ok(HttpApi::new(client))
}

#[async_trait]
impl AgriApi for HttpApi {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, RequestError> {
        self.client
            .send_json(ApiRequest::post("/api/chat/").json(request)?)
            .await
    }

    async fn predict(&self, image: &ImageFile) -> Result<PredictionResult, RequestError> {
        self.client
            .send_json(ApiRequest::post("/api/predict/").multipart(image.to_part("image")))
            .await
    }

    async fn list_farms(&self) -> Result<Vec<Farm>, RequestError> {
        self.client.send_json(ApiRequest::get("/api/farms/")).await
    }

    async fn create_farm(&self, farm: &NewFarm) -> Result<(), RequestError> {
        self.client
            .send_unit(ApiRequest::post("/api/farms/").json(farm)?)
            .await
    }

    async fn delete_farm(&self, id: FarmId) -> Result<(), RequestError> {
        self.client
            .send_unit(ApiRequest::delete(format!("/api/farms/{id}/")))
            .await
    }

    async fn farm_weather(&self, id: FarmId) -> Result<WeatherSnapshot, RequestError> {
        self.client
            .send_json(ApiRequest::get(format!("/api/farms/{id}/weather/")))
            .await
    }

    async fn list_crops(&self) -> Result<Vec<Crop>, RequestError> {
        self.client.send_json(ApiRequest::get("/api/crops/")).await
    }
}
