//! Terminal interaction.

use std::io::{self, BufRead, Write};

use mailgate_core::DeviceCodePrompt;
use mailgate_oauth::DeviceAuthorization;
use tracing::warn;

/// Prints the device code and opens the verification page.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

impl DeviceCodePrompt for ConsolePrompt {
    fn present(&self, auth: &DeviceAuthorization) {
        println!();
        match &auth.message {
            Some(message) => println!("{message}"),
            None => println!(
                "To sign in, open {} and enter the code {}",
                auth.verification_uri, auth.user_code
            ),
        }
        println!("Waiting for sign-in (Ctrl-C to abort)...");
        open_browser(&auth.verification_uri);
    }
}

/// Best effort; failure is only logged.
pub fn open_browser(url: &str) {
    if let Err(e) = opener::open_browser(url) {
        warn!("Could not open a browser: {e}");
    }
}

/// Prints `label` and reads one trimmed line from `input`.
pub fn ask(input: &mut impl BufRead, label: &str) -> io::Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}
