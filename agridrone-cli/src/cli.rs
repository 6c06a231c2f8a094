use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use inquire::{
    Confirm, CustomType, Select, Text,
    error::{InquireError, InquireResult},
};
use tracing::debug;

use agridrone_core::{
    AgriApi, ChatSession, Config, Coordinates, Deletion, FarmDashboard, FarmId, LocationPicker,
    PredictionSession, api_from_config,
    chat::QUICK_QUESTIONS,
    dashboard::DELETE_PROMPT,
    geocoder_from_config, location_source_from_config,
    model::CropId,
};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "agridrone",
    version,
    about = "AgriDrone assistant, farm weather dashboard and crop disease detection"
)]
pub struct Cli {
    /// Backend base URL, overriding the configured one.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the backend URL, geocoder and an optional fixed location.
    Configure,

    /// Talk to the agricultural assistant.
    Chat {
        /// Send a single message and exit instead of starting a conversation.
        #[arg(long, short)]
        message: Option<String>,
    },

    /// Manage farms and view their weather.
    Farms {
        #[command(subcommand)]
        command: FarmsCommand,
    },

    /// List crops the backend knows about.
    Crops,

    /// Analyze a crop image for blight.
    Predict {
        /// Path to a PNG, JPG, JPEG, WEBP, GIF or BMP image.
        image: PathBuf,
    },

    /// Resolve a place name or a point with the geocoder.
    Locate {
        #[command(subcommand)]
        command: LocateCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum FarmsCommand {
    /// List registered farms.
    List,

    /// Register a new farm. Missing values are prompted for.
    Create(CreateFarmArgs),

    /// Delete a farm.
    Delete {
        id: FarmId,

        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },

    /// Show current weather, forecast and farming insights for a farm.
    Weather { id: FarmId },
}

#[derive(Debug, Args)]
pub struct CreateFarmArgs {
    #[arg(long)]
    pub name: Option<String>,

    /// Place name to search for instead of giving coordinates.
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    pub search: Option<String>,

    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Crop id, see `agridrone crops`.
    #[arg(long)]
    pub crop: Option<CropId>,
}

#[derive(Debug, Subcommand)]
pub enum LocateCommand {
    /// Find the first place matching a free-text query.
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Name the place at a point.
    Reverse {
        #[arg(allow_negative_numbers = true)]
        lat: f64,

        #[arg(allow_negative_numbers = true)]
        lon: f64,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load()?;
        if let Some(url) = self.api_url {
            config.api_base_url = url;
        }

        match self.command {
            Command::Configure => configure(config),
            Command::Chat { message } => chat(&config, message).await,
            Command::Farms { command } => farms(&config, command).await,
            Command::Crops => crops(&config).await,
            Command::Predict { image } => predict(&config, image).await,
            Command::Locate { command } => locate(&config, command).await,
        }
    }
}

fn backend(config: &Config) -> Result<Arc<dyn AgriApi>> {
    let api = api_from_config(config)
        .with_context(|| format!("Cannot use backend at {}", config.api_base_url))?;
    Ok(Arc::new(api))
}

fn location_picker(config: &Config) -> Result<LocationPicker> {
    let geocoder = geocoder_from_config(config)
        .with_context(|| format!("Cannot use geocoder at {}", config.geocoder_url))?;
    Ok(LocationPicker::new(Arc::new(geocoder)))
}

/// Map prompt cancellation (Esc / Ctrl-C) to `None`.
fn cancellable<T>(res: InquireResult<T>) -> Result<Option<T>> {
    match res {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// A cancelled confirmation is a refusal; a prompt that could not be shown is an error.
fn confirmed(res: InquireResult<bool>) -> Result<bool> {
    Ok(cancellable(res)?.unwrap_or(false))
}

fn configure(mut config: Config) -> Result<()> {
    let api_base_url = Text::new("Backend base URL:")
        .with_default(&config.api_base_url)
        .prompt()?;
    let geocoder_url = Text::new("Geocoder base URL:")
        .with_default(&config.geocoder_url)
        .prompt()?;
    config.api_base_url = api_base_url.trim().to_string();
    config.geocoder_url = geocoder_url.trim().to_string();

    let share = Confirm::new("Share a fixed location with the assistant?")
        .with_default(config.location.is_some())
        .prompt()?;

    if share {
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_error_message("Please type a number in degrees")
            .prompt()?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_error_message("Please type a number in degrees")
            .prompt()?;
        config.set_location(Coordinates::new(latitude, longitude));
    } else {
        config.clear_location();
    }

    config.validate()?;
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn chat(config: &Config, message: Option<String>) -> Result<()> {
    let mut session = ChatSession::new(backend(config)?);
    session.locate(location_source_from_config(config).as_ref()).await;

    if let Some(text) = message {
        session.send_message(&text).await?;
        if let Some(reply) = session.messages().last() {
            println!("{}", render::message(reply));
        }
        return Ok(());
    }

    println!("{}", render::message(&session.messages()[0]));
    println!("(/quick for suggested questions, /exit to leave)");

    loop {
        let Some(line) = cancellable(Text::new("You:").prompt())? else {
            break;
        };

        let before = session.messages().len();
        let (sent, typed) = match line.trim() {
            "/exit" | "/quit" => break,
            "/quick" => {
                let choice = cancellable(
                    Select::new("Quick questions:", QUICK_QUESTIONS.to_vec()).raw_prompt(),
                )?;
                let Some(choice) = choice else {
                    continue;
                };
                (session.ask_quick(choice.index).await, false)
            }
            _ => {
                session.set_input(line.clone());
                (session.submit_input().await, true)
            }
        };

        if let Err(reason) = sent {
            debug!(%reason, "message not sent");
            continue;
        }

        // The user's own turn is already on screen when they typed it.
        let skip = usize::from(typed);
        for msg in &session.messages()[before + skip..] {
            println!("{}", render::message(msg));
        }
    }

    Ok(())
}

async fn farms(config: &Config, command: FarmsCommand) -> Result<()> {
    let mut dashboard = FarmDashboard::new(backend(config)?);

    match command {
        FarmsCommand::List => {
            dashboard.load_farms().await.context("Error fetching farms")?;
            print!("{}", render::farms(dashboard.farms(), None));
        }

        FarmsCommand::Create(args) => create_farm(config, &mut dashboard, args).await?,

        FarmsCommand::Delete { id, yes } => {
            let approved = yes || confirmed(Confirm::new(DELETE_PROMPT).with_default(false).prompt())?;
            let outcome = dashboard.delete_farm(id, |_| approved).await?;

            match outcome {
                Deletion::Deleted => {
                    println!("Farm #{id} deleted.");
                    print!("{}", render::farms(dashboard.farms(), None));
                }
                Deletion::Cancelled => println!("Cancelled."),
            }
        }

        FarmsCommand::Weather { id } => {
            dashboard.fetch_weather(id).await?;
            if let Some(snapshot) = dashboard.weather() {
                print!("{}", render::weather(snapshot));
            }
        }
    }

    Ok(())
}

async fn create_farm(config: &Config, dashboard: &mut FarmDashboard, args: CreateFarmArgs) -> Result<()> {
    dashboard.load().await;
    if dashboard.crops().is_empty() {
        bail!("The backend returned no crops; cannot register a farm without one.");
    }
    dashboard.toggle_create_form();

    let name = match args.name {
        Some(name) => name,
        None => Text::new("Farm name:").prompt()?,
    };

    let mut picker = location_picker(config)?;
    match (args.lat, args.lon, args.search) {
        (Some(lat), Some(lon), _) => {
            if let Err(notice) = picker.pick_point(Coordinates::new(lat, lon)).await {
                eprintln!("{notice}");
            }
        }
        (_, _, Some(query)) => {
            picker.search(&query).await.map_err(|notice| anyhow!("{notice}: {query}"))?;
        }
        _ => {
            while picker.selection().is_none() {
                let Some(query) = cancellable(Text::new("Search for a location:").prompt())? else {
                    println!("Cancelled.");
                    return Ok(());
                };
                if let Err(notice) = picker.search(&query).await {
                    eprintln!("{notice}");
                }
            }
        }
    }

    if let Some(picked) = picker.selection() {
        println!("{}", render::picked(&picked));
        dashboard.form_mut().apply_location(&picked);
    }

    let crop = match args.crop {
        Some(id) => Some(id),
        None => {
            let names: Vec<String> = dashboard.crops().iter().map(|c| c.name.clone()).collect();
            cancellable(Select::new("Select crop:", names).raw_prompt())?
                .map(|choice| dashboard.crops()[choice.index].id)
        }
    };

    let form = dashboard.form_mut();
    form.name = name;
    form.crop = crop;

    dashboard.create_farm().await?;
    println!("Farm created successfully!");
    print!("{}", render::farms(dashboard.farms(), None));

    Ok(())
}

async fn crops(config: &Config) -> Result<()> {
    let mut dashboard = FarmDashboard::new(backend(config)?);
    dashboard.load_crops().await.context("Error fetching crops")?;
    println!("{}", render::crops(dashboard.crops()));
    Ok(())
}

async fn predict(config: &Config, image: PathBuf) -> Result<()> {
    let mut session = PredictionSession::new(backend(config)?);
    session.select_path(&image)?;

    if let Some(file) = session.file() {
        println!("Analyzing {} ({} bytes, {})...", file.file_name(), file.len(), file.mime());
    }
    session.submit().await?;

    if let Some(error) = session.error() {
        bail!("{error}");
    }
    if let Some(view) = session.view() {
        print!("{}", render::prediction(&view));
    }

    Ok(())
}

async fn locate(config: &Config, command: LocateCommand) -> Result<()> {
    let mut picker = location_picker(config)?;

    match command {
        LocateCommand::Search { query } => {
            let query = query.join(" ");
            picker.search(&query).await.map_err(|notice| anyhow!("{notice}: {query}"))?;
        }
        LocateCommand::Reverse { lat, lon } => {
            picker.pick_point(Coordinates::new(lat, lon)).await?;
        }
    }

    match picker.selection() {
        Some(picked) => println!("{}", render::picked(&picked)),
        None => println!("No name found for this point."),
    }

    Ok(())
}
