//! Wayfare CLI - a command-line front end for the wayfare travel planner.
//!
//! Each invocation restores the saved session (or signs in with a remembered
//! password), runs one command against the travel API through the core's
//! caches, and prints the result as JSON.

use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wayfare_core::auth::{CredentialStore, Session};
use wayfare_core::models::NewItineraryItem;
use wayfare_core::{ApiClient, ApiError, CacheRegistry, CacheSettings, Config, Planner, TravelApi};

const USAGE: &str = "\
Usage: wayfare <command> [args]

Commands:
  login <username> [--remember]   Sign in (prompts for password)
  logout                          Sign out and forget remembered password
  trip <trip-id>                  Show a trip
  place <place-id> [--basic]      Show a place (full detail unless --basic)
  tags <tag-type>                 List tags of one type
  itinerary <trip-id> <day>       Show one itinerary day
  plan <trip-id> <day> <place-id> Add a place to an itinerary day
  add-place <trip-id> <place-id>  Add a place to a trip
  remove-place <trip-id> <place-id>
  in-trip <trip-id> <place-id>    Check whether a place is in a trip

Read commands accept --refresh to bypass the cache.";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let refresh = args.iter().any(|a| a == "--refresh");
    let args: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|a| *a != "--refresh")
        .collect();

    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = Config::load().context("Failed to load config")?;
    let base_url = config.api_base_url();
    let credentials = CredentialStore::for_backend(&base_url);
    let api = ApiClient::new(&base_url)?;
    let api: Arc<dyn TravelApi> = Arc::new(api);
    let settings = CacheSettings::default().with_max_entries(config.cache_max_entries);
    let caches = Arc::new(CacheRegistry::new(&settings));
    let planner = Planner::new(api, caches, Session::new(config.data_dir()?));

    match args.as_slice() {
        ["login", username, rest @ ..] => {
            let remember = rest.contains(&"--remember");
            return login(&planner, &credentials, &mut config, username, remember).await;
        }
        ["logout"] => {
            planner.sign_out().await?;
            if let Some(ref username) = config.last_username {
                match credentials.forget(username) {
                    Ok(true) => debug!(backend = credentials.backend(), "Forgot remembered password"),
                    Ok(false) => {}
                    Err(e) => debug!(error = %e, "Could not remove remembered password"),
                }
            }
            println!("Signed out");
            return Ok(());
        }
        _ => {}
    }

    ensure_signed_in(&planner, &credentials, &config).await?;
    let result = run_command(&planner, &args, refresh).await;
    if let Err(ref e) = result {
        if let Some(api_err) = e.downcast_ref::<ApiError>() {
            planner.handle_error(api_err).await;
        }
    }
    result
}

async fn login(
    planner: &Planner,
    credentials: &CredentialStore,
    config: &mut Config,
    username: &str,
    remember: bool,
) -> Result<()> {
    let password = rpassword::prompt_password("Password: ")
        .context("Failed to read password")?;
    planner.login(username, &password).await?;

    if remember {
        credentials.remember(username, &password)?;
    }
    config.last_username = Some(username.to_string());
    config.save().context("Failed to save config")?;
    println!("Signed in as {}", username);
    Ok(())
}

/// Use the saved session, or sign in again with a remembered password.
async fn ensure_signed_in(planner: &Planner, credentials: &CredentialStore, config: &Config) -> Result<()> {
    if planner.restore_session().await? {
        return Ok(());
    }

    let Some(ref username) = config.last_username else {
        bail!("Not signed in. Run `wayfare login <username>` first.");
    };
    let Some(password) = credentials.recall(username)? else {
        bail!(
            "Session expired and no remembered password for {}. Run `wayfare login` again.",
            credentials.account(username)
        );
    };
    planner.login(username, &password).await?;
    info!(username = %username, "Signed in with remembered password");
    Ok(())
}

fn parse_day(day: &str) -> Result<u32> {
    day.parse()
        .with_context(|| format!("Invalid day number: {}", day))
}

async fn run_command(planner: &Planner, args: &[&str], refresh: bool) -> Result<()> {
    match args {
        ["trip", trip_id] => print_json(&planner.trips.fetch_trip(trip_id, refresh).await?),
        ["place", place_id] => {
            print_json(&planner.places.fetch_place_detail(place_id, refresh).await?)
        }
        ["place", place_id, "--basic"] => {
            print_json(&planner.places.fetch_place_basic(place_id, refresh).await?)
        }
        ["tags", tag_type] => print_json(&planner.places.fetch_tags(tag_type, refresh).await?),
        ["itinerary", trip_id, day] => {
            let day = parse_day(day)?;
            print_json(&planner.itineraries.fetch_day(trip_id, day, refresh).await?)
        }
        ["plan", trip_id, day, place_id] => {
            let item = NewItineraryItem {
                place_id: place_id.to_string(),
                start_time: None,
                notes: None,
            };
            let created = planner
                .itineraries
                .add_item(trip_id, parse_day(day)?, &item)
                .await?;
            print_json(&created)
        }
        ["add-place", trip_id, place_id] => {
            match planner.trips.add_place_to_trip(trip_id, place_id).await {
                Ok(()) => println!("Added {} to {}", place_id, trip_id),
                Err(ApiError::AlreadyInTrip { .. }) => {
                    println!("{} is already in {}", place_id, trip_id)
                }
                Err(e) => return Err(e.into()),
            }
            Ok(())
        }
        ["remove-place", trip_id, place_id] => {
            planner.trips.remove_place_from_trip(trip_id, place_id).await?;
            println!("Removed {} from {}", place_id, trip_id);
            Ok(())
        }
        ["in-trip", trip_id, place_id] => {
            let in_trip = planner.trips.is_place_in_trip(trip_id, place_id, refresh).await?;
            print_json(&serde_json::json!({ "tripId": trip_id, "placeId": place_id, "inTrip": in_trip }))
        }
        _ => {
            eprintln!("{}", USAGE);
            bail!("Unknown command: {}", args.join(" "))
        }
    }
}
