//! X API Token Refresh Utility
//!
//! Exchanges a refresh token for a new OAuth 2.0 User Context access token and
//! prints the values to store in `xapi_access_token` / `xapi_refresh_token`.

use std::io::{self, Write};

use tasktweet::oauth::{refresh_access_token, TWITTER_TOKEN_URL};

fn prompt(label: &str) -> io::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("🔄 X API Token Refresh Utility");
    println!("==============================");

    let client_id = prompt("Enter your X App Client ID")?;
    let client_secret = prompt("Enter your X App Client Secret")?;
    let refresh_token = prompt("Enter your refresh token")?;

    println!("\n🔄 Refreshing access token...");
    let http = reqwest::Client::new();
    let (access_token, new_refresh_token) = refresh_access_token(
        &http,
        TWITTER_TOKEN_URL,
        &client_id,
        &client_secret,
        &refresh_token,
    )
    .await?;

    println!("\n✅ Success! Your new access token is:");
    println!("{}", access_token);
    println!("\n📝 Update your environment:");
    println!("   export xapi_access_token=\"{}\"", access_token);

    if let Some(new_refresh_token) = new_refresh_token {
        println!("   export xapi_refresh_token=\"{}\"", new_refresh_token);
        println!("\n⚠️  IMPORTANT: Your old refresh token is now invalid!");
    }

    Ok(())
}
