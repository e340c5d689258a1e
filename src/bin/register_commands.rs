use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let token = env::var("DISCORD_BOT_TOKEN").map_err(|_| "DISCORD_BOT_TOKEN required")?;
    let app_id = env::var("DISCORD_APPLICATION_ID").map_err(|_| "DISCORD_APPLICATION_ID required")?;
    let guild_id = env::var("DISCORD_GUILD_ID").map_err(|_| "DISCORD_GUILD_ID required")?;

    // Guild command, visible to administrators only (default_member_permissions = ADMINISTRATOR)
    let commands = serde_json::json!([
        {
            "name": linkdrop::discord::interactions::SEND_LINK_EMBED,
            "description": "Post the link generator embed with its button",
            "default_member_permissions": "8",
            "dm_permission": false,
            "contexts": [0]
        }
    ]);

    let url = format!(
        "https://discord.com/api/v10/applications/{}/guilds/{}/commands",
        app_id, guild_id
    );

    let client = reqwest::Client::new();
    let res = client
        .put(&url)
        .header("Authorization", format!("Bot {}", token))
        .header("Content-Type", "application/json")
        .json(&commands)
        .send()
        .await?;

    if res.status().is_success() {
        println!("✅ Slash command registered.");
        let body: serde_json::Value = res.json().await?;
        println!(
            "Registered {} commands",
            body.as_array().map(|a| a.len()).unwrap_or(0)
        );
    } else {
        let status = res.status();
        let body = res.text().await?;
        eprintln!("❌ Failed to register commands: {} - {}", status, body);
    }

    Ok(())
}
