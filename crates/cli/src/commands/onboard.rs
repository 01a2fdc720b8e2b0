//! `flightdeck onboard`: first-time setup.

use flightdeck_config::AppConfig;

use super::CommandResult;

pub async fn run() -> CommandResult {
    let config_dir = AppConfig::config_dir();
    let config_path = AppConfig::config_path();

    println!("✈️  FlightDeck: First-Time Setup");
    println!("================================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Start Ollama (`ollama serve`) or add a [providers.openai] entry with an API key");
    println!("   2. Run: flightdeck doctor");
    println!("   3. Run: flightdeck sim --game flight --text-only\n");

    Ok(())
}
