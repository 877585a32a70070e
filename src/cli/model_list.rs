//! Model listing functionality
//!
//! This module lists the models offered by the configured endpoint.

use std::error::Error;

use crate::api::models::fetch_models;
use crate::auth::AuthManager;
use crate::cli::Paths;
use crate::utils::url::models_url;

pub async fn list_models(paths: &Paths) -> Result<(), Box<dyn Error>> {
    let settings = paths.load_settings()?;
    let Some(resolved) = AuthManager::new().resolve(&settings) else {
        return Err("❌ No API key configured\n\nPlease either:\n1. Run 'liunian auth' to store a key in your system keyring,\n2. Run 'liunian set api-key <key>', or\n3. Set the OPENAI_API_KEY environment variable".into());
    };

    println!("🤖 Available Models at {}", models_url(&settings.api_url));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!("🎯 Current model: {} (from config)", settings.model);
    println!();

    let client = reqwest::Client::new();
    let models_response = fetch_models(&client, &settings.api_url, &resolved.key).await?;

    if models_response.data.is_empty() {
        println!("No models found for this endpoint.");
        return Ok(());
    }

    let mut models = models_response.data;
    models.sort_by(|a, b| a.id.cmp(&b.id));
    println!("Found {} models:", models.len());
    println!();
    for model in models {
        let marker = if model.id == settings.model { " ✓" } else { "" };
        println!("  • {}{marker}", model.id);
        if let Some(owned_by) = &model.owned_by {
            if !owned_by.is_empty() && owned_by != "system" {
                println!("    Owner: {owned_by}");
            }
        }
    }
    println!();
    println!("💡 Switch with: liunian set model <id>");

    Ok(())
}
