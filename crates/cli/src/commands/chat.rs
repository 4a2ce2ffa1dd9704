//! `lumen chat`: interactive or single-message chat against a gateway.
//!
//! The conversation is saved under the client data directory and restored on
//! the next run. In interactive mode the prompt stays usable while a reply is
//! pending; lines typed meanwhile are sent together once it lands.

use std::io::Write;
use std::sync::Arc;

use lumen_client::{ChatSession, HttpTransport, RequestCoalescer};
use lumen_config::AppConfig;
use lumen_core::message::Transcript;
use lumen_memory::FileTranscriptStore;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    message: Option<String>,
    server_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let server_url = server_override.unwrap_or_else(|| config.client.server_url.clone());

    let store = Arc::new(FileTranscriptStore::new(config.client.data_dir()));
    let session = ChatSession::open(store)?;
    let transport = Arc::new(HttpTransport::new(&server_url));
    let coalescer = RequestCoalescer::new(transport, session, config.chat.error_reply.clone());

    if let Some(msg) = message {
        // Single message mode
        let shown = coalescer.transcript().len();
        coalescer.submit(&msg)?;

        eprint!("  Thinking...");
        coalescer.wait_idle().await;
        eprint!("\r              \r");

        print_replies(&coalescer.transcript(), shown);
        return Ok(());
    }

    // Interactive mode
    let mut shown = coalescer.transcript().len();
    println!();
    println!("  Lumen: Interactive Chat");
    println!("  Server:  {server_url}");
    if shown > 0 {
        println!("  Restored {shown} earlier messages");
    }
    println!();
    println!("  Type your message and press Enter. You can keep typing while");
    println!("  a reply is pending; those lines are sent together.");
    println!("  /flush  resend everything pending now");
    println!("  /clear  forget this conversation");
    println!("  exit    quit");
    println!();
    prompt()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut updates = coalescer.subscribe();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "" => {}
                    "exit" | "quit" => break,
                    "/flush" => coalescer.flush(),
                    "/clear" => {
                        coalescer.clear()?;
                        shown = 0;
                        println!("  Conversation cleared.");
                    }
                    text => {
                        coalescer.submit(text)?;
                    }
                }
                prompt()?;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let transcript = coalescer.transcript();
                if print_replies(&transcript, shown) {
                    prompt()?;
                }
                shown = transcript.len();
            }
        }
    }

    if !coalescer.is_idle() {
        println!("  Unanswered messages are saved and will be kept as history.");
    }
    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

/// Print assistant entries after index `from`. Returns whether any were printed.
fn print_replies(transcript: &Transcript, from: usize) -> bool {
    let mut printed = false;
    for message in transcript.messages().iter().skip(from).filter(|m| !m.is_user()) {
        let label = if message.is_error { "Error" } else { "Lumen" };
        println!();
        for line in message.text.lines() {
            println!("  {label} > {line}");
        }
        println!();
        printed = true;
    }
    printed
}
