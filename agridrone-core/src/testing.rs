//! In-memory collaborators for session tests.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::{collections::VecDeque, sync::Mutex};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

use crate::{
    api::AgriApi,
    error::RequestError,
    geocoder::Geocoder,
    location::LocationSource,
    model::{
        ChatReply, ChatRequest, Coordinates, Crop, CurrentConditions, Farm, FarmId, NewFarm, Place,
        PredictionResult, WeatherSnapshot,
    },
    prediction::ImageFile,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Chat(ChatRequest),
    Predict(String),
    ListFarms,
    CreateFarm(NewFarm),
    DeleteFarm(FarmId),
    Weather(FarmId),
    ListCrops,
}

/// Scripted backend. Chat echoes unless replies are queued; farm mutations
/// update the stored list so refetches observe them.
#[derive(Debug)]
pub(crate) struct FakeApi {
    calls: Mutex<Vec<Call>>,
    chat: Mutex<VecDeque<Result<ChatReply, RequestError>>>,
    predictions: Mutex<VecDeque<Result<PredictionResult, RequestError>>>,
    farms: Mutex<Result<Vec<Farm>, RequestError>>,
    crops: Mutex<Result<Vec<Crop>, RequestError>>,
    weather: Mutex<Result<WeatherSnapshot, RequestError>>,
    mutation_error: Mutex<Option<RequestError>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            chat: Mutex::new(VecDeque::new()),
            predictions: Mutex::new(VecDeque::new()),
            farms: Mutex::new(Ok(Vec::new())),
            crops: Mutex::new(Ok(vec![
                Crop { id: 1, name: "Tomato".into() },
                Crop { id: 2, name: "Potato".into() },
            ])),
            weather: Mutex::new(Ok(snapshot("Nashik"))),
            mutation_error: Mutex::new(None),
        }
    }
}

impl FakeApi {
    pub fn with_farms(farms: Vec<Farm>) -> Self {
        let api = Self::default();
        *api.farms.lock().unwrap() = Ok(farms);
        api
    }

    pub fn queue_chat(&self, reply: Result<&str, RequestError>) {
        self.chat
            .lock()
            .unwrap()
            .push_back(reply.map(|r| ChatReply { response: r.to_string() }));
    }

    pub fn queue_prediction(&self, result: Result<PredictionResult, RequestError>) {
        self.predictions.lock().unwrap().push_back(result);
    }

    pub fn fail_farm_list(&self, err: RequestError) {
        *self.farms.lock().unwrap() = Err(err);
    }

    pub fn fail_crop_list(&self, err: RequestError) {
        *self.crops.lock().unwrap() = Err(err);
    }

    pub fn set_weather(&self, weather: Result<WeatherSnapshot, RequestError>) {
        *self.weather.lock().unwrap() = weather;
    }

    pub fn fail_mutations(&self, err: RequestError) {
        *self.mutation_error.lock().unwrap() = Some(err);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AgriApi for FakeApi {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, RequestError> {
        self.record(Call::Chat(request.clone()));
        self.chat.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(ChatReply { response: format!("echo: {}", request.message) })
        })
    }

    async fn predict(&self, image: &ImageFile) -> Result<PredictionResult, RequestError> {
        self.record(Call::Predict(image.file_name().to_string()));
        self.predictions.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(PredictionResult {
                label: None,
                is_blight: false,
                method: None,
                prob: None,
                score: None,
            })
        })
    }

    async fn list_farms(&self) -> Result<Vec<Farm>, RequestError> {
        self.record(Call::ListFarms);
        self.farms.lock().unwrap().clone()
    }

    async fn create_farm(&self, farm: &NewFarm) -> Result<(), RequestError> {
        self.record(Call::CreateFarm(farm.clone()));
        if let Some(err) = self.mutation_error.lock().unwrap().clone() {
            return Err(err);
        }

        if let Ok(farms) = self.farms.lock().unwrap().as_mut() {
            let id = farms.iter().map(|f| f.id).max().unwrap_or(0) + 1;
            farms.insert(0, Farm {
                id,
                name: farm.name.clone(),
                location_name: farm.location_name.clone(),
                latitude: farm.latitude,
                longitude: farm.longitude,
                crop: Some(format!("crop-{}", farm.crop)),
            });
        }
        Ok(())
    }

    async fn delete_farm(&self, id: FarmId) -> Result<(), RequestError> {
        self.record(Call::DeleteFarm(id));
        if let Some(err) = self.mutation_error.lock().unwrap().clone() {
            return Err(err);
        }

        if let Ok(farms) = self.farms.lock().unwrap().as_mut() {
            farms.retain(|f| f.id != id);
        }
        Ok(())
    }

    async fn farm_weather(&self, id: FarmId) -> Result<WeatherSnapshot, RequestError> {
        self.record(Call::Weather(id));
        self.weather.lock().unwrap().clone()
    }

    async fn list_crops(&self) -> Result<Vec<Crop>, RequestError> {
        self.record(Call::ListCrops);
        self.crops.lock().unwrap().clone()
    }
}

pub(crate) fn farm(id: FarmId, name: &str) -> Farm {
    Farm {
        id,
        name: name.to_string(),
        location_name: format!("{name} village"),
        latitude: 20.0,
        longitude: 73.8,
        crop: Some("Tomato".into()),
    }
}

pub(crate) fn snapshot(location: &str) -> WeatherSnapshot {
    WeatherSnapshot {
        location: location.to_string(),
        current: CurrentConditions {
            temperature: 29.4,
            feels_like: 31.0,
            humidity: 64.0,
            wind_speed: 3.2,
            pressure: 1009.0,
            weather_condition: "Clouds".into(),
            weather_description: "scattered clouds".into(),
        },
        forecast: Vec::new(),
        insights: Vec::new(),
    }
}

/// Geocoder with one scripted answer per direction.
#[derive(Debug)]
pub(crate) struct FakeGeocoder {
    pub search: Mutex<Result<Option<Place>, RequestError>>,
    pub reverse: Mutex<Result<Option<String>, RequestError>>,
    pub calls: Mutex<usize>,
}

impl FakeGeocoder {
    pub fn new(
        search: Result<Option<Place>, RequestError>,
        reverse: Result<Option<String>, RequestError>,
    ) -> Self {
        Self {
            search: Mutex::new(search),
            reverse: Mutex::new(reverse),
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn search(&self, _query: &str) -> Result<Option<Place>, RequestError> {
        *self.calls.lock().unwrap() += 1;
        self.search.lock().unwrap().clone()
    }

    async fn reverse(&self, _coordinates: Coordinates) -> Result<Option<String>, RequestError> {
        *self.calls.lock().unwrap() += 1;
        self.reverse.lock().unwrap().clone()
    }
}

#[derive(Debug)]
pub(crate) struct FakeLocation(pub Option<Coordinates>);

#[async_trait]
impl LocationSource for FakeLocation {
    async fn current_position(&self) -> Option<Coordinates> {
        self.0
    }
}

/// What a [`serve_once`] stub received.
#[derive(Debug)]
pub(crate) struct Captured {
    pub head: String,
    pub body: Vec<u8>,
}

impl Captured {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then_some(value.trim())
        })
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Bind a loopback port, answer exactly one request with `status` and a JSON
/// `body`, and hand back what was sent. Returns the base URL to point a client at.
pub(crate) async fn serve_once(status: u16, body: &str) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let reason = StatusCode::from_u16(status).unwrap().canonical_reason().unwrap_or("");
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut stream).await;
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        captured
    });

    (format!("http://{addr}"), handle)
}

/// A base URL nothing listens on.
pub(crate) async fn closed_port() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

async fn read_request(stream: &mut TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before request headers ended");
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut captured = Captured { head, body: buf[head_end..].to_vec() };

    let length = captured.header("content-length").and_then(|v| v.parse::<usize>().ok());
    let chunked = captured
        .header("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));

    loop {
        let done = match length {
            Some(len) => captured.body.len() >= len,
            None if chunked => captured.body.ends_with(b"0\r\n\r\n"),
            None => true,
        };
        if done {
            break;
        }
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        captured.body.extend_from_slice(&chunk[..n]);
    }

    if let Some(len) = length {
        captured.body.truncate(len);
    }
    captured
}
