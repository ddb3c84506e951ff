use reqwest::Client;
use resumable_upload::{FnProgress, ProgressStatus, Upload, UploadSource};
use std::env;
use tokio::fs::File;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = env::args().nth(1).unwrap_or_else(|| "movie.mp4".to_string());
    let endpoint = env::args()
        .nth(2)
        .unwrap_or_else(|| "https://example.com/upload/drive/v3/files".to_string());

    println!("Opening {}...", path);
    let file = File::open(&path).await?;
    let total_len = file.metadata().await?.len();

    let source = UploadSource::sized(file, total_len);

    let client = Client::new();

    println!("Uploading {} bytes to {}...", total_len, endpoint);
    let upload = Upload::<serde_json::Value>::new(client, endpoint, "POST", source, "application/octet-stream")?
        .with_metadata(serde_json::json!({ "name": path }))
        .with_progress_subscriber(FnProgress(|p| match p.status {
            ProgressStatus::Starting => println!("starting..."),
            ProgressStatus::Uploading => println!("sent {} bytes", p.bytes_sent),
            ProgressStatus::Completed => println!("done, {} bytes total", p.bytes_sent),
            ProgressStatus::Failed => {
                println!("failed after {} bytes: {}", p.bytes_sent, p.error.as_ref().unwrap())
            }
        }))
        .on_response(|body: &serde_json::Value| println!("server response: {}", body));

    let progress = upload.upload().await?;
    println!("\nUpload finished: {} bytes sent", progress.bytes_sent);

    Ok(())
}
