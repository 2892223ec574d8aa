//! Url command implementation.

use super::ClientArgs;

/// Prints the init and sync URLs for the configured environment.
pub fn run(args: &ClientArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = args.client()?;
    println!("init: POST {}", client.init().to_url());
    println!("sync: GET  {}", client.sync("-").to_url());
    Ok(())
}
