use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use destination_server::fetch::{
    FetchRequest, FetchSession, HttpTransport, HttpTransportConfig, ResponseCache,
};
use destination_server::matcher::MatchEngine;

/// Default destination data API.
const DEFAULT_API_BASE: &str = "https://restcountries.com/v3.1/name";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "destination_server=info".into()),
        )
        .init();

    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.is_empty() {
        eprintln!("Usage: destination-server <place name>");
        std::process::exit(2);
    }

    // Correct the query against the place table first.
    let engine = MatchEngine::new();
    let result = engine.find_best_match(&query);

    let destination = match &result.destination {
        Some(name) if result.is_exact => {
            println!("Searching for {name}");
            name.clone()
        }
        Some(name) if result.has_good_match => {
            println!("Did you mean {name}? (confidence {:.2})", result.confidence);
            for suggestion in &result.suggestions {
                println!("  or: {} ({})", suggestion.name, suggestion.country);
            }
            name.clone()
        }
        _ => {
            // No correction: search the literal query.
            println!("No close match for \"{query}\", searching as-is");
            query.clone()
        }
    };

    let api_base =
        std::env::var("DESTINATION_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

    let transport =
        HttpTransport::new(&HttpTransportConfig::new()).expect("Failed to create HTTP transport");
    let session = FetchSession::new(ResponseCache::default(), Arc::new(transport));

    let url = format!("{}/{}", api_base, destination.to_lowercase());
    let state = session
        .resolve(FetchRequest::get(url), CancellationToken::new())
        .await;

    match (state.data, state.error) {
        (Some(data), _) => {
            println!("{}", serde_json::to_string_pretty(&*data).unwrap_or_default())
        }
        (None, Some(error)) => {
            eprintln!("Fetch failed: {error}");
            std::process::exit(1);
        }
        (None, None) => eprintln!("No data returned"),
    }
}
