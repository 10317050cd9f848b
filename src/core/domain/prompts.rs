//! Interactive callbacks for age plugins.
//!
//! Plugins (hardware tokens and the like) may need to show a message, ask
//! for a PIN or wait for a touch. All prompts go to the terminal's stderr
//! so stdout stays clean for ciphertext.

use age::secrecy::SecretString;
use console::Term;
use dialoguer::{Confirm, Input, Password, Select};
use tracing::debug;

/// [`age::Callbacks`] backed by `dialoguer` prompts on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompts;

impl age::Callbacks for TerminalPrompts {
    fn display_message(&self, message: &str) {
        let _ = Term::stderr().write_line(message);
    }

    fn confirm(&self, message: &str, yes_string: &str, no_string: Option<&str>) -> Option<bool> {
        debug!(message, "plugin confirmation");
        match no_string {
            Some(no) => Select::new()
                .with_prompt(message)
                .items(&[yes_string, no])
                .default(0)
                .interact_opt()
                .ok()
                .flatten()
                .map(|choice| choice == 0),
            None => Confirm::new()
                .with_prompt(format!("{} ({})", message, yes_string))
                .default(true)
                .interact_opt()
                .ok()
                .flatten(),
        }
    }

    fn request_public_string(&self, description: &str) -> Option<String> {
        Input::<String>::new()
            .with_prompt(description)
            .interact_text()
            .ok()
    }

    fn request_passphrase(&self, description: &str) -> Option<SecretString> {
        Password::new()
            .with_prompt(description)
            .interact()
            .ok()
            .map(SecretString::from)
    }
}
