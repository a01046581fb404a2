//! Basic example - connect to a running browser, open a tab and navigate.
//!
//! Start a browser with `--remote-debugging-port=9222` first.

use cdp::domains::{browser, page, target};
use cdp::CDPClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cdp_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://localhost:9222/devtools/browser".to_string());
    println!("Connecting to browser at: {}", cdp_url);

    let client = CDPClient::connect(&cdp_url).await?;
    let version = client.send(browser::GetVersion {}).await?;
    println!("Connected to {}", version.product);

    let target_id = client.send(target::CreateTarget::new("about:blank")).await?;
    let session = client.attach(&target_id).await?;
    println!("Attached to target {} as {}", target_id, session.session_id());

    session.on_event(|event: page::LifecycleEvent| {
        println!("lifecycle: {}", event.name);
    });

    session.send(page::Enable {}).await?;
    session
        .send(page::SetLifecycleEventsEnabled { enabled: true })
        .await?;
    let nav = session.send(page::Navigate::new("http://example.com/")).await?;
    println!("Navigating frame {}", nav.frame_id);

    // Let a few lifecycle events arrive before shutting down.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;

    session.close().await;
    client.close().await;
    println!("Disconnected");

    Ok(())
}
