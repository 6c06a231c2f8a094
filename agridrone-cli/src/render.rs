use std::fmt::Write as _;

use agridrone_core::{
    Crop, Farm, FarmId, Message, PickedLocation, PredictionView, Role, WeatherSnapshot,
};

const FORECAST_DAYS: usize = 5;

pub fn message(msg: &Message) -> String {
    match msg.role {
        Role::User => format!("You: {}", msg.content),
        Role::Assistant => format!("Assistant: {}", msg.content),
    }
}

pub fn farms(farms: &[Farm], selected: Option<FarmId>) -> String {
    if farms.is_empty() {
        return "No farms yet. Add your first farm with `agridrone farms create`.".to_string();
    }

    let mut out = String::new();
    for farm in farms {
        let marker = if selected == Some(farm.id) { "*" } else { " " };
        let crop = farm.crop.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default();
        let _ = writeln!(out, "{marker} #{:<4} {}{crop}", farm.id, farm.name);
        let _ = writeln!(out, "        {}", farm.location_name);
    }
    out
}

pub fn crops(crops: &[Crop]) -> String {
    crops
        .iter()
        .map(|c| format!("#{:<4} {}", c.id, c.name))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn picked(location: &PickedLocation) -> String {
    format!(
        "Selected: {}\nLat: {:.6}, Lng: {:.6}",
        location.location_name, location.coordinates.latitude, location.coordinates.longitude
    )
}

pub fn weather(snapshot: &WeatherSnapshot) -> String {
    let c = &snapshot.current;
    let description = if c.weather_description.is_empty() { "N/A" } else { c.weather_description.as_str() };

    let mut out = String::new();
    let _ = writeln!(out, "{}", snapshot.location);
    let _ = writeln!(out, "  {}°C  {description}", c.temperature.round());
    let _ = writeln!(out, "  Feels like: {}°C", c.feels_like.round());
    let _ = writeln!(out, "  Humidity:   {}%", c.humidity.round());
    let _ = writeln!(out, "  Wind speed: {} m/s", c.wind_speed.round());
    let _ = writeln!(out, "  Pressure:   {} hPa", c.pressure.round());

    if !snapshot.forecast.is_empty() {
        let _ = writeln!(out, "\n5-Day Forecast");
        for day in snapshot.forecast.iter().take(FORECAST_DAYS) {
            let date = day
                .date()
                .map(|d| d.format("%a, %b %-d").to_string())
                .unwrap_or_else(|| day.timestamp.clone());
            let _ = writeln!(
                out,
                "  {date:<12} {:>3}°C  {}",
                day.temperature.round(),
                day.weather_description
            );
        }
    }

    if !snapshot.insights.is_empty() {
        let _ = writeln!(out, "\nFarming Insights");
        for insight in &snapshot.insights {
            let _ = writeln!(out, "  [{}] {}", insight.priority, insight.title);
            let _ = writeln!(out, "      {}", insight.description);
        }
    }

    out
}

pub fn prediction(view: &PredictionView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Prediction: {}", view.headline);
    let _ = writeln!(out, "Method:     {}", view.method);
    if let Some(confidence) = &view.confidence {
        let _ = writeln!(out, "Confidence: {confidence}");
    }
    if let Some(score) = &view.score {
        let _ = writeln!(out, "Score:      {score}");
    }

    if view.is_blight {
        let _ = writeln!(out, "\nRecommendations:");
        for rec in view.recommendations() {
            let _ = writeln!(out, "  - {rec}");
        }
    }
    if let Some(note) = view.status_note() {
        let _ = writeln!(out, "\nStatus: {note}");
    }

    out
}
