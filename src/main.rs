//! Interactive front-desk console.
//!
//! Reads one utterance per line from stdin, prints tool activity as it
//! happens, then the agent's reply. Record-store changes are echoed as a
//! one-line dashboard summary.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use hospital_agent::agent_core::record_store::{FinancialStatus, InvoiceStatus, StoreSnapshot};
use hospital_agent::agent_core::{CallbackObserver, Orchestrator, RecordStore, ToolResponse};
use hospital_agent::inference::config::{find_config_path, load_models_config};
use hospital_agent::inference::{InferenceClient, ToolCall};

#[tokio::main]
async fn main() -> Result<()> {
    let log_path = hospital_agent::init_tracing().context("failed to initialize logging")?;

    let cwd = std::env::current_dir().context("failed to read working directory")?;
    let config_path = find_config_path(&cwd)?;
    let config = load_models_config(&config_path)?;
    let settings = config.agent.clone();
    let client = InferenceClient::from_config(config)?;

    let store = Arc::new(if settings.seed_demo_data {
        RecordStore::with_demo_data()
    } else {
        RecordStore::new()
    });
    let dashboard = Arc::downgrade(&store);
    let subscription = store.subscribe(move || {
        if let Some(store) = dashboard.upgrade() {
            println!("  {}", dashboard_line(&store.snapshot()));
        }
    });

    let mut orchestrator = Orchestrator::from_settings(Box::new(client), Arc::clone(&store), &settings);
    let session_id = uuid::Uuid::new_v4().to_string();

    println!("Hospital front desk ({})", orchestrator.model_name());
    println!("config: {}", config_path.display());
    println!("log:    {}", log_path.display());
    println!("{}", dashboard_line(&store.snapshot()));
    println!("Type a request, /records to dump the store, /quit to exit.\n");

    let mut observer = CallbackObserver::new(
        |call: &ToolCall| println!("  -> {} {}", call.name, call.arguments),
        |response: &ToolResponse| {
            let summary = response
                .result
                .message
                .as_deref()
                .or(response.result.content.as_deref())
                .unwrap_or("");
            println!("  <- {} [{:?}] {summary}", response.name, response.result.status);
        },
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = line.trim();
        match text {
            "" => continue,
            "/quit" | "/exit" => break,
            "/records" => {
                println!("{}", serde_json::to_string_pretty(&store.snapshot())?);
                continue;
            }
            _ => {}
        }

        let reply = orchestrator
            .submit_user_turn(&session_id, text, &mut observer)
            .await;
        println!("\n{reply}\n");
    }

    subscription.unsubscribe();
    tracing::info!(session_id = %session_id, "session closed");
    Ok(())
}

fn dashboard_line(snapshot: &StoreSnapshot) -> String {
    let unpaid = snapshot
        .financials
        .iter()
        .filter(|f| f.status == FinancialStatus::Invoice(InvoiceStatus::Unpaid))
        .count();
    format!(
        "[records] patients: {} | appointments: {} | financial records: {} ({unpaid} unpaid invoices)",
        snapshot.patients.len(),
        snapshot.appointments.len(),
        snapshot.financials.len(),
    )
}
