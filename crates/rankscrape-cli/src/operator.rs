use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use rankscrape_harvest::Operator;
use tokio::sync::oneshot;

/// Asks on the terminal; anything but "y"/"yes" declines.
///
/// The answer is read on a detached thread so an interrupt can still end the
/// run while the prompt is open.
pub(crate) struct StdinOperator;

#[async_trait]
impl Operator for StdinOperator {
    async fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let (tx, rx) = oneshot::channel();
        std::thread::spawn(move || {
            let mut line = String::new();
            let answer = io::stdin().lock().read_line(&mut line).map(|_| line);
            tx.send(answer).ok();
        });
        match rx.await {
            Ok(Ok(line)) => is_yes(&line),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "could not read operator answer");
                false
            }
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
