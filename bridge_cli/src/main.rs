use std::time::Duration;

use bridge_cli::BridgeClient;
use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use serde_json::{json, Value};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Agent-side client for the AI bridge", long_about = None)]
struct Cli {
    /// Address of the bridge request socket.
    #[arg(long, default_value = "127.0.0.1:5555")]
    endpoint: String,
    /// How long to wait for each reply.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
    /// Pretty-print JSON replies.
    #[arg(long)]
    pretty: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send the greeting probe.
    Hello,
    /// Request one observation.
    Observe,
    /// Submit an action, e.g. `act walk_to '{"x":3200,"y":3200}'`.
    Act {
        action_type: String,
        #[arg(default_value = "{}")]
        parameters: String,
    },
    /// Observe, walk, then type a line of chat.
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut client = BridgeClient::new(&cli.endpoint, Duration::from_millis(cli.timeout_ms));
    info!(endpoint = %client.endpoint(), "client.ready");

    match cli.command {
        Command::Hello => {
            let reply = client
                .hello()
                .await
                .wrap_err_with(|| format!("hello to {} failed", cli.endpoint))?;
            println!("{reply}");
        }
        Command::Observe => print_json(&client.get_observation().await, cli.pretty)?,
        Command::Act {
            action_type,
            parameters,
        } => {
            let parameters: Value = serde_json::from_str(&parameters)
                .wrap_err("action parameters must be a JSON object")?;
            let reply = client.execute_action(&action_type, &parameters).await;
            print_json(&reply, cli.pretty)?;
        }
        Command::Demo => {
            print_json(&client.get_observation().await, cli.pretty)?;
            let walk = client
                .execute_action("walk_to", &json!({"x": 3200, "y": 3200, "plane": 0}))
                .await;
            print_json(&walk, cli.pretty)?;
            let typed = client
                .execute_action("type_string", &json!({"text": "Hello from the agent!"}))
                .await;
            print_json(&typed, cli.pretty)?;
        }
    }

    Ok(())
}

fn print_json(value: &Value, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}
