//! Terminal feed client: connects to a relay and prints every message line.

use std::io::Write;

use anyhow::Result;
use clap::Parser;

use feed_relay::client::{
    shared_feed_url, feed_url, CloseReason, DecodeError, DecodePolicy, FeedClient, FeedObserver,
    InboundMessage, OutputBuffer, LINE_BREAK,
};
use feed_relay::config::Settings;
use feed_relay::telemetry::{init_tracing, LogFormat};

#[derive(Debug, Parser)]
#[command(name = "feed-tail", version, about = "Print the messages of a feed relay")]
struct Args {
    /// Relay host and optional port (defaults to client.host)
    #[arg(long)]
    host: Option<String>,

    /// Join a shared document feed instead of the default one
    #[arg(long)]
    doc: Option<String>,

    /// Lines kept in the output region (defaults to client.capacity)
    #[arg(long)]
    capacity: Option<usize>,

    /// What to do with a frame that fails to decode: skip or terminate
    #[arg(long)]
    on_decode_error: Option<DecodePolicy>,

    /// Print the retained output region on close
    #[arg(long)]
    dump: bool,
}

/// Mirrors each rendered line to stdout
struct TailObserver<W: Write> {
    output: OutputBuffer,
    out: W,
}

impl<W: Write> FeedObserver for TailObserver<W> {
    fn on_message(&mut self, message: &InboundMessage) {
        self.output.on_message(message);
        if let Some(line) = self.output.last() {
            if let Err(e) = write!(self.out, "{}{}", line, LINE_BREAK).and_then(|_| self.out.flush()) {
                tracing::warn!(error = %e, "Failed to write to stdout");
            }
        }
    }

    fn on_decode_error(&mut self, error: &DecodeError) {
        tracing::debug!(error = %error, "Frame skipped");
    }

    fn on_close(&mut self, reason: &CloseReason) {
        tracing::debug!(reason = %reason, retained = self.output.len(), "Output region closed");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info", LogFormat::from_env());

    let args = Args::parse();
    let settings = Settings::new()?;

    let host = args.host.unwrap_or(settings.client.host);
    let capacity = args.capacity.unwrap_or(settings.client.capacity);
    let policy = args.on_decode_error.unwrap_or(settings.client.on_decode_error);

    let url = match &args.doc {
        Some(doc_id) => shared_feed_url(&host, doc_id),
        None => feed_url(&host),
    };

    let session = FeedClient::connect_url(&url, policy).await?;

    let mut observer = TailObserver {
        output: OutputBuffer::new(capacity),
        out: std::io::stdout(),
    };
    let summary = session.run(&mut observer).await;

    if args.dump {
        let rendered = observer.output.render();
        observer.out.write_all(rendered.as_bytes())?;
        observer.out.flush()?;
    }

    tracing::info!(
        frames = summary.frames_received,
        rendered = summary.messages_rendered,
        decode_errors = summary.decode_errors,
        evicted = observer.output.evicted(),
        reason = %summary.close_reason,
        "Session finished"
    );

    Ok(())
}
