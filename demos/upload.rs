use riskradar_client::{RiskRadarClient, RiskRadarError, UploadFile};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: upload <scan.nessus>"))?;

    let mut client = RiskRadarClient::from_env().map_err(anyhow::Error::msg)?;

    if !client.is_authenticated().await {
        anyhow::bail!("RISKRADAR_TOKEN was rejected");
    }

    let file = UploadFile::from_path(&path).await?;
    let result = match client.upload_nessus_file(file.clone(), false).await {
        Ok(result) => result,
        Err(RiskRadarError::DuplicateFile { duplicate_info, .. }) => {
            eprintln!("already imported: {duplicate_info}; re-importing");
            client.upload_nessus_file(file, true).await?
        }
        Err(err) => return Err(err.into()),
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
