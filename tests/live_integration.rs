use riskradar_client::{RiskRadarClient, RiskRadarError, UploadHistoryQuery};

fn load_live_client() -> Result<RiskRadarClient, String> {
    let base_url = std::env::var("RISKRADAR_BASE_URL")
        .map_err(|_| "RISKRADAR_BASE_URL env is required".to_owned())?;
    let token =
        std::env::var("RISKRADAR_TOKEN").map_err(|_| "RISKRADAR_TOKEN env is required".to_owned())?;
    if base_url.trim().is_empty() || token.trim().is_empty() {
        return Err("RISKRADAR_BASE_URL/RISKRADAR_TOKEN must not be empty".to_owned());
    }
    Ok(RiskRadarClient::with_token(base_url, token))
}

#[tokio::test]
async fn live_status_auth_and_history() {
    let mut client = match load_live_client() {
        Ok(client) => client,
        Err(_) => {
            eprintln!("skipping live test: RISKRADAR_BASE_URL/RISKRADAR_TOKEN not set");
            return;
        }
    };

    let status = client.api_status().await.expect("status must succeed");
    assert!(status.is_object());

    assert!(
        client.is_authenticated().await,
        "live token must be accepted"
    );
    let profile = client.user_profile().await.expect("profile must load");
    assert!(profile.is_object());

    let history = client
        .upload_history(&UploadHistoryQuery {
            limit: Some(5),
            ..UploadHistoryQuery::default()
        })
        .await
        .expect("history must load");
    assert!(history.is_object());

    // Non-admin tokens are expected to be rejected here; both outcomes are fine.
    match client.system_health().await {
        Ok(health) => assert!(health.is_object()),
        Err(RiskRadarError::Permission { .. }) => {}
        Err(other) => panic!("unexpected health error: {other}"),
    }
}
