use clap::{Parser, Subcommand};
use dukapay::application::alerts::StockAlertEngine;
use dukapay::application::audit::AuditRecorder;
use dukapay::application::initiator::{PaymentInitiator, PaymentRequest};
use dukapay::application::reconciler::PaymentReconciler;
use dukapay::config::GatewayConfig;
use dukapay::domain::ids::{ActorId, AlertId, CorrelationId};
use dukapay::domain::ports::PaymentGatewayRef;
use dukapay::infrastructure::Stores;
use dukapay::infrastructure::daraja::DarajaGateway;
use dukapay::interfaces::alert_action::Role;
use dukapay::interfaces::csv::alert_writer::AlertWriter;
use dukapay::interfaces::csv::product_reader::ProductReader;
use dukapay::interfaces::webhook::{self, Response};
use dukapay::telemetry;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load catalogue products from a CSV file
    ImportProducts { input: PathBuf },

    /// Raise restock alerts for low-stock products and print them as CSV
    Scan {
        /// Products CSV to import before scanning
        #[arg(long)]
        products: Option<PathBuf>,

        /// Keep scanning every SECS seconds until interrupted
        #[arg(long, value_name = "SECS")]
        every: Option<u64>,
    },

    /// Print every restock alert as CSV, newest first
    Alerts,

    /// Acknowledge or complete a restock alert
    Alert {
        id: AlertId,
        #[arg(long)]
        actor: String,
        #[arg(long)]
        role: Role,
        /// JSON body, e.g. '{"action":"complete","quantity":40}'
        #[arg(long)]
        request: String,
    },

    /// Send an STK push payment request
    Pay {
        #[arg(long)]
        phone: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        reference: String,
        #[arg(long, default_value = "Payment")]
        description: String,
        #[arg(long)]
        actor: Option<String>,
        #[command(flatten)]
        gateway: GatewayConfig,
    },

    /// Query the gateway for a pending transaction and apply the answer
    Verify {
        checkout_request_id: String,
        #[arg(long)]
        actor: Option<String>,
        #[command(flatten)]
        gateway: GatewayConfig,
    },

    /// Apply a gateway callback body read from a file
    Callback { input: PathBuf },
}

fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    let Some(db_path) = db_path else {
        return Ok(Stores::in_memory());
    };

    #[cfg(feature = "storage-rocksdb")]
    {
        Stores::rocksdb(db_path).into_diagnostic()
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path ({}), but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage.",
            db_path.display()
        );
        Ok(Stores::in_memory())
    }
}

fn alert_engine(stores: &Stores) -> StockAlertEngine {
    StockAlertEngine::new(
        stores.inventory.clone(),
        stores.alerts.clone(),
        stores.ledger.clone(),
        AuditRecorder::new(stores.audit.clone()),
    )
}

fn daraja(config: &GatewayConfig) -> Result<PaymentGatewayRef> {
    let (key, secret) = config.consumer().into_diagnostic()?;
    let gateway =
        DarajaGateway::new(&config.base_url, key, secret, config.timeout()).into_diagnostic()?;
    Ok(Arc::new(gateway))
}

async fn import_products(stores: &Stores, path: &Path) -> Result<usize> {
    let file = File::open(path).into_diagnostic()?;
    let mut imported = 0;
    for product in ProductReader::new(file).products() {
        match product {
            Ok(product) => {
                stores.inventory.upsert(product).await.into_diagnostic()?;
                imported += 1;
            }
            Err(e) => tracing::warn!(error = %e, "Skipping unreadable product row"),
        }
    }
    tracing::info!(imported, "Products imported");
    Ok(imported)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn finish(response: Response) -> Result<()> {
    print_json(&response.body)?;
    if response.is_success() {
        Ok(())
    } else {
        Err(miette::miette!("request failed with status {}", response.status))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::setup_tracing();
    let cli = Cli::parse();
    let stores = open_stores(cli.db_path)?;

    match cli.command {
        Command::ImportProducts { input } => {
            import_products(&stores, &input).await?;
        }
        Command::Scan { products, every } => {
            if let Some(path) = products {
                import_products(&stores, &path).await?;
            }
            let engine = alert_engine(&stores);

            match every {
                None => {
                    let report = engine.scan_and_create_alerts().await.into_diagnostic()?;
                    AlertWriter::new(io::stdout().lock())
                        .write_alerts(&report.alerts)
                        .into_diagnostic()?;
                }
                Some(secs) => {
                    let mut ticker = tokio::time::interval(Duration::from_secs(secs.max(1)));
                    loop {
                        tokio::select! {
                            _ = ticker.tick() => {
                                let response = webhook::scan_response(engine.scan_and_create_alerts().await);
                                if !response.is_success() {
                                    tracing::warn!(status = response.status, "Scan failed; retrying on next tick");
                                }
                            }
                            _ = tokio::signal::ctrl_c() => {
                                tracing::info!("Interrupted; stopping scans");
                                break;
                            }
                        }
                    }
                }
            }
        }
        Command::Alerts => {
            let alerts = alert_engine(&stores).alerts().await.into_diagnostic()?;
            AlertWriter::new(io::stdout().lock())
                .write_alerts(&alerts)
                .into_diagnostic()?;
        }
        Command::Alert {
            id,
            actor,
            role,
            request,
        } => {
            let engine = alert_engine(&stores);
            let response = webhook::handle_alert_action(
                &engine,
                id,
                &ActorId::new(actor),
                role,
                request.as_bytes(),
            )
            .await;
            finish(response)?;
        }
        Command::Pay {
            phone,
            amount,
            reference,
            description,
            actor,
            gateway,
        } => {
            let initiator = PaymentInitiator::new(
                daraja(&gateway)?,
                stores.transactions.clone(),
                gateway.credentials().into_diagnostic()?,
                gateway.callback_url().into_diagnostic()?,
                gateway.timeout(),
            )
            .with_calling_code(gateway.calling_code.clone());

            let tx = initiator
                .initiate(PaymentRequest {
                    payer_phone: phone,
                    amount,
                    reference,
                    description,
                    initiated_by: actor.map(ActorId::new),
                })
                .await
                .into_diagnostic()?;
            print_json(&tx)?;
        }
        Command::Verify {
            checkout_request_id,
            actor,
            gateway,
        } => {
            let reconciler = PaymentReconciler::new(
                stores.transactions.clone(),
                AuditRecorder::new(stores.audit.clone()),
            )
            .with_gateway(
                daraja(&gateway)?,
                gateway.credentials().into_diagnostic()?,
                gateway.timeout(),
            );

            let actor = actor.map(ActorId::new);
            let reconciliation = reconciler
                .verify(&CorrelationId::new(checkout_request_id), actor.as_ref())
                .await
                .into_diagnostic()?;
            print_json(&reconciliation.transaction)?;
        }
        Command::Callback { input } => {
            let body = std::fs::read(&input).into_diagnostic()?;
            let reconciler = PaymentReconciler::new(
                stores.transactions.clone(),
                AuditRecorder::new(stores.audit.clone()),
            );
            finish(webhook::handle_callback(&reconciler, &body).await)?;
        }
    }

    Ok(())
}
