use debatebot::debatebot_core::{Arguments, NoopHelper};
use debatebot::PluginRegistry;
use std::env;
use std::process;

const USAGE: &str = "usage: debate-cli list | debate-cli <function> [json-arguments]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    debatebot_observability::init_tracing();

    let mut args = env::args().skip(1);
    let command = args.next().ok_or(USAGE)?;
    let registry = PluginRegistry::from_env()?;

    if command == "list" {
        println!("{}", serde_json::to_string_pretty(&registry.specs())?);
        return Ok(());
    }

    let arguments: Arguments = match args.next() {
        Some(raw) => serde_json::from_str(&raw)?,
        None => Arguments::new(),
    };
    let result = registry.execute(&command, &NoopHelper, arguments).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.is_success() {
        process::exit(1);
    }
    Ok(())
}
