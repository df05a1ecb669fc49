//! The interactive loop: a poll thread prints the chat while the main thread
//! reads lines to send.

use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use tbgclient::{ChatConnection, ChatMessage, Session};
use tracing::{debug, warn};

/// Names are cropped or padded to this width.
const NAME_WIDTH: usize = 16;

/// Chat command that ends the client after being sent.
const QUIT: &str = "/quit";

pub fn run(session: Session, interval: Duration) -> anyhow::Result<()> {
    let (outbox, inbox) = mpsc::channel();
    let chat = ChatConnection::new(session);
    let poller = thread::Builder::new()
        .name("poll".to_string())
        .spawn(move || poll_loop(chat, inbox, interval))
        .context("spawning the poll thread")?;

    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let quitting = is_quit(&line);
        if outbox.send(line).is_err() || quitting {
            break;
        }
    }
    drop(outbox);

    eprintln!("Waiting until the message handler quits...");
    match poller.join() {
        Ok(result) => result,
        Err(_) => anyhow::bail!("the poll thread panicked"),
    }
}

fn poll_loop(mut chat: ChatConnection, inbox: Receiver<String>, interval: Duration) -> anyhow::Result<()> {
    loop {
        match chat.poll() {
            Ok(infos) if !infos.is_empty() => debug!(target: "tbg.chat", ?infos, "connection info"),
            Ok(_) => {}
            Err(err) => warn!(target: "tbg.chat", error = %err, "poll failed"),
        }
        for message in chat.messages() {
            println!("{}", render(&message));
        }

        loop {
            match inbox.try_recv() {
                Ok(text) => {
                    chat.send(&text).context("sending a message")?;
                    if is_quit(&text) {
                        return Ok(());
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }

        thread::sleep(interval);
    }
}

fn is_quit(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case(QUIT)
}

/// `name │ text`, with the name right-aligned.
pub fn render(message: &ChatMessage) -> String {
    let name: String = message.user.name.chars().take(NAME_WIDTH).collect();
    format!("{} │ {}", format!("{name:>NAME_WIDTH$}").bold(), message.content)
}
