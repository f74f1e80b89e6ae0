//! Watch a room's danmu from the command line.
//!
//! ```text
//! cargo run --example watch -- [room_id] [--json]
//! RUST_LOG=danmu_client=debug cargo run --example watch -- 288016
//! ```

use danmu_client::config::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_ROOM_ID};
use danmu_client::{Message, MessageType, Session};

fn print_json(message: &Message) {
    match serde_json::to_string(message) {
        Ok(line) => println!("{}", line),
        Err(e) => eprintln!("cannot encode message: {}", e),
    }
}

fn print_chat(message: &Message) {
    println!(
        "<level {}> - {} >>> {}",
        message.field_str("level").unwrap_or("0"),
        message.field_str("nn").unwrap_or_default(),
        message.field_str("txt").unwrap_or_default()
    );
}

fn print_enter(message: &Message) {
    println!(
        "<level {}> - {} entered the room",
        message.field_str("level").unwrap_or("0"),
        message.field_str("nn").unwrap_or_default()
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut room_id = DEFAULT_ROOM_ID;
    let mut json = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            other => room_id = other.parse()?,
        }
    }

    let builder = Session::builder();
    let builder = if json {
        builder.handler(print_json)
    } else {
        builder
            .on(MessageType::ChatMessage, print_chat)
            .on(MessageType::UserEnter, print_enter)
    };

    let mut session = builder.connect(DEFAULT_HOST, DEFAULT_PORT).await?;
    session.join_room(room_id).await?;

    let closer = session.closer();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            closer.close();
        }
    });

    match session.watch().await {
        Err(danmu_client::DanmuError::ConnectionClosed) => Ok(()),
        Err(e) => Err(e.into()),
        Ok(()) => Ok(()),
    }
}
