use crate::api::ModelsResponse;
use crate::utils::url::models_url;

pub async fn fetch_models(
    client: &reqwest::Client,
    api_url: &str,
    api_key: &str,
) -> Result<ModelsResponse, Box<dyn std::error::Error>> {
    let response = client
        .get(models_url(api_url))
        .header("Authorization", format!("Bearer {api_key}"))
        .header("Content-Type", "application/json")
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(format!("Model listing failed with status {status}: {error_text}").into());
    }

    let models_response = response.json::<ModelsResponse>().await?;
    Ok(models_response)
}
