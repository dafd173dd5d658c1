//! Hands finished messages to a WhatsApp client.
//!
//! Delivery is best-effort: a successful [`Dispatcher::send`] only means the
//! client reported no error. Nothing here confirms that the message arrived,
//! retries, or rate-limits beyond the per-call minimum delay.

use std::fmt;
use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::settings::{MessagingMode, MessagingSettings};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Phone number is required")]
    MissingPhone,

    #[error("Message text is empty")]
    EmptyMessage,

    #[error("Messaging client failed: {0}")]
    Client(String),
}

/// "Open a chat with `phone` and send `text`" capability.
pub trait MessagingClient: Send + Sync {
    fn send(&self, phone: &str, text: &str, delay: Duration, close_after: bool) -> Result<(), DispatchError>;
}

/// Drives web.whatsapp.com through the desktop browser.
///
/// Opens the prefilled chat URL with `browser_command`, waits `delay` for the
/// page to load, then runs `submit_command` (typically a key-injection tool
/// pressing Enter) and, if asked, `close_command` to close the tab. The
/// browser profile must already be logged in.
#[derive(Debug, Clone)]
pub struct WebWhatsAppClient {
    browser_command: String,
    submit_command: Option<String>,
    close_command: Option<String>,
}

impl WebWhatsAppClient {
    pub fn new(browser_command: impl Into<String>, submit_command: Option<String>, close_command: Option<String>) -> Self {
        Self {
            browser_command: browser_command.into(),
            submit_command,
            close_command,
        }
    }
}

/// Pause between submitting and closing the tab.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

impl MessagingClient for WebWhatsAppClient {
    fn send(&self, phone: &str, text: &str, delay: Duration, close_after: bool) -> Result<(), DispatchError> {
        run_command(&self.browser_command, Some(&chat_url(phone, text)))?;
        thread::sleep(delay);

        if let Some(submit) = &self.submit_command {
            run_command(submit, None)?;
        }

        if close_after {
            if let Some(close) = &self.close_command {
                thread::sleep(CLOSE_GRACE);
                run_command(close, None)?;
            }
        }

        Ok(())
    }
}

/// Logs instead of sending. Used with `messaging.mode = "dry-run"`.
#[derive(Debug, Clone, Default)]
pub struct LoggingClient;

impl MessagingClient for LoggingClient {
    fn send(&self, phone: &str, text: &str, delay: Duration, close_after: bool) -> Result<(), DispatchError> {
        tracing::info!(
            phone,
            delay_secs = delay.as_secs(),
            close_after,
            chars = text.chars().count(),
            "dry-run: message not sent"
        );
        Ok(())
    }
}

pub fn chat_url(phone: &str, text: &str) -> String {
    let phone: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    format!(
        "https://web.whatsapp.com/send?phone={}&text={}",
        urlencoding::encode(&phone),
        urlencoding::encode(text)
    )
}

fn run_command(command_line: &str, arg: Option<&str>) -> Result<(), DispatchError> {
    let mut parts = command_line.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| DispatchError::Client("empty command configured".to_string()))?;

    let mut command = Command::new(program);
    command.args(parts);
    if let Some(arg) = arg {
        command.arg(arg);
    }

    let status = command
        .status()
        .map_err(|err| DispatchError::Client(format!("could not run {program}: {err}")))?;
    if !status.success() {
        return Err(DispatchError::Client(format!("{program} exited with {status}")));
    }
    Ok(())
}

#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn MessagingClient>,
    min_delay: Duration,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("min_delay", &self.min_delay)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(client: Arc<dyn MessagingClient>, min_delay: Duration) -> Self {
        Self { client, min_delay }
    }

    pub fn from_settings(settings: &MessagingSettings) -> Self {
        let client: Arc<dyn MessagingClient> = match settings.mode {
            MessagingMode::Browser => Arc::new(WebWhatsAppClient::new(
                settings.browser_command.clone(),
                settings.submit_command.clone(),
                settings.close_command.clone(),
            )),
            MessagingMode::DryRun => Arc::new(LoggingClient),
        };
        Self::new(client, Duration::from_secs(settings.min_delay_seconds))
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Blocks for at least the configured minimum delay.
    pub fn send(&self, phone: &str, text: &str, delay: Duration, close_after: bool) -> Result<(), DispatchError> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(DispatchError::MissingPhone);
        }
        if text.trim().is_empty() {
            return Err(DispatchError::EmptyMessage);
        }

        let delay = delay.max(self.min_delay);
        tracing::info!(phone, delay_secs = delay.as_secs(), close_after, "dispatching message");

        self.client
            .send(phone, text, delay, close_after)
            .inspect_err(|err| tracing::warn!(phone, error = %err, "message dispatch failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, String, Duration, bool)>>,
    }

    impl MessagingClient for Recorder {
        fn send(&self, phone: &str, text: &str, delay: Duration, close_after: bool) -> Result<(), DispatchError> {
            self.calls
                .lock()
                .unwrap()
                .push((phone.to_string(), text.to_string(), delay, close_after));
            Ok(())
        }
    }

    #[test]
    fn delay_is_raised_to_the_minimum() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(recorder.clone(), Duration::from_secs(15));

        dispatcher.send(" +27821234567 ", "hello", Duration::from_secs(3), true).unwrap();
        dispatcher.send("+27821234567", "again", Duration::from_secs(30), false).unwrap();

        let calls = recorder.calls.lock().unwrap();
        assert_eq!(calls[0], ("+27821234567".to_string(), "hello".to_string(), Duration::from_secs(15), true));
        assert_eq!(calls[1].2, Duration::from_secs(30));
    }

    #[test]
    fn blank_phone_or_text_never_reaches_the_client() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(recorder.clone(), Duration::ZERO);

        assert!(matches!(dispatcher.send("  ", "hi", Duration::ZERO, false), Err(DispatchError::MissingPhone)));
        assert!(matches!(dispatcher.send("+1", " ", Duration::ZERO, false), Err(DispatchError::EmptyMessage)));
        assert!(recorder.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn chat_url_encodes_phone_and_text() {
        assert_eq!(
            chat_url("+27 82 123 4567", "R100 & free delivery"),
            "https://web.whatsapp.com/send?phone=%2B27821234567&text=R100%20%26%20free%20delivery"
        );
    }

    #[cfg(unix)]
    #[test]
    fn browser_client_reports_command_failures() {
        let ok = WebWhatsAppClient::new("true", Some("true".to_string()), None);
        assert!(ok.send("+1", "hi", Duration::ZERO, true).is_ok());

        let failing = WebWhatsAppClient::new("true", Some("false".to_string()), None);
        assert!(matches!(failing.send("+1", "hi", Duration::ZERO, false), Err(DispatchError::Client(_))));

        let missing = WebWhatsAppClient::new("definitely-not-a-browser-binary", None, None);
        assert!(matches!(missing.send("+1", "hi", Duration::ZERO, false), Err(DispatchError::Client(_))));
    }
}
