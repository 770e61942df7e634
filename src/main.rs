use anyhow::Result;
use clap::Parser;
use smokewatch::{Consumer, StallMonitor, DEFAULT_QUEUE};
use smokewatch_notify::SmtpNotifier;
use smokewatch_types::MONITORED_ITEM;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "smokewatch")]
#[command(about = "Watch a temperature queue and email an alert when the food stalls")]
struct Args {
    /// Host name or IP address of the RabbitMQ server (or a full amqp:// URI)
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Queue carrying the temperature readings
    #[arg(short, long, default_value = DEFAULT_QUEUE)]
    queue: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    // One message at a time end to end; a single-threaded runtime is enough.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(run(args))
}

async fn run(args: Args) -> Result<()> {
    let notifier = SmtpNotifier::builder().build();
    let monitor = StallMonitor::new(MONITORED_ITEM, notifier);

    let mut consumer = match Consumer::connect(&args.host, args.queue.as_str(), monitor).await {
        Ok(consumer) => consumer,
        Err(e) => {
            error!(
                "Connection to RabbitMQ server failed. Verify the server is running on host={}",
                args.host
            );
            return Err(e.into());
        }
    };

    consumer.run(shutdown_signal()).await?;

    info!(
        "Processed {} messages ({} stalls). Goodbye.",
        consumer.acked(),
        consumer.stalls()
    );
    Ok(())
}

/// Resolves on CTRL+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
