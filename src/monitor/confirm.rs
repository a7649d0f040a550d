//! Operator confirmation before an interactive purge

use std::io::{self, Read, Write};
use std::sync::mpsc as std_mpsc;

use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Yes/no question put to the operator.
///
/// Implementations must treat anything other than an explicit "yes" as a
/// refusal. The future is raced against shutdown, so it has to be safe to
/// drop at any await point.
#[allow(async_fn_in_trait)]
pub trait Confirmer {
    async fn confirm(&mut self, question: &str) -> bool;
}

/// One pending answer; `None` is EOF or a read error
type AnswerSlot = oneshot::Sender<Option<String>>;

/// Asks on stdout and reads the answer from stdin.
///
/// A helper thread reads exactly one line per question and nothing while no
/// question is open, one byte at a time. Whatever follows the answer stays
/// on stdin for the purge command (sudo reads its password from there).
/// An interrupt can abandon the question without waiting for enter; the
/// outstanding read is then picked up by the next question. EOF (stdin
/// closed or redirected from /dev/null) counts as "no".
pub struct StdinConfirmer {
    reader: Option<std_mpsc::Sender<AnswerSlot>>,
    pending: Option<oneshot::Receiver<Option<String>>>,
}

impl StdinConfirmer {
    pub fn new() -> Self {
        Self {
            reader: None,
            pending: None,
        }
    }

    /// Read answers from `input` instead of stdin
    pub fn with_input<R: Read + Send + 'static>(input: R) -> Self {
        Self {
            reader: Some(spawn_line_reader(input)),
            pending: None,
        }
    }

    fn request_line(&mut self) -> Option<oneshot::Receiver<Option<String>>> {
        let reader = self
            .reader
            .get_or_insert_with(|| spawn_line_reader(stdin_source()));
        let (tx, rx) = oneshot::channel();
        reader.send(tx).ok()?;
        Some(rx)
    }
}

impl Default for StdinConfirmer {
    fn default() -> Self {
        Self::new()
    }
}

impl Confirmer for StdinConfirmer {
    async fn confirm(&mut self, question: &str) -> bool {
        print!("{} (y/n): ", question);
        if let Err(e) = io::stdout().flush() {
            warn!("Could not show confirmation prompt: {}", e);
            return false;
        }

        if self.pending.is_none() {
            self.pending = self.request_line();
        }
        let answer = match self.pending.as_mut() {
            Some(rx) => rx.await.ok().flatten(),
            None => None,
        };
        self.pending = None;

        match answer {
            Some(answer) => is_affirmative(&answer),
            None => {
                // Keep the terminal tidy after the unanswered prompt
                println!();
                debug!("No answer on stdin, treating as no");
                false
            }
        }
    }
}

/// Serve one line from `input` per request until the confirmer is dropped
fn spawn_line_reader<R: Read + Send + 'static>(mut input: R) -> std_mpsc::Sender<AnswerSlot> {
    let (tx, rx) = std_mpsc::channel::<AnswerSlot>();
    std::thread::spawn(move || {
        for slot in rx {
            let line = read_line_unbuffered(&mut input).unwrap_or_else(|e| {
                debug!("stdin read failed: {}", e);
                None
            });
            // Receiver gone means the question was abandoned at shutdown
            let _ = slot.send(line);
        }
    });
    tx
}

/// stdin without std's shared buffer, which would swallow input past the
/// answer line
fn stdin_source() -> Box<dyn Read + Send> {
    #[cfg(unix)]
    {
        use std::os::fd::AsFd;

        match io::stdin().as_fd().try_clone_to_owned() {
            Ok(fd) => return Box::new(std::fs::File::from(fd)),
            Err(e) => debug!("Could not duplicate stdin, reading it buffered: {}", e),
        }
    }
    Box::new(io::stdin())
}

/// Read up to and including the next newline and no further.
/// Returns `None` at EOF with nothing read.
fn read_line_unbuffered<R: Read>(input: &mut R) -> io::Result<Option<String>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        match input.read(&mut byte) {
            Ok(0) if line.is_empty() => return Ok(None),
            Ok(0) => break,
            Ok(_) if byte[0] == b'\n' => break,
            Ok(_) => line.push(byte[0]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

/// Only an explicit y/yes counts as consent
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
