use std::io::IsTerminal;

use dialoguer::Input;
use signoff_core::commands::{InputRequest, Prompt, DETAILS_INPUT, TITLE_INPUT};
use tracing::debug;

/// Answers from command-line flags first, then from the terminal when one is attached.
#[derive(Debug, Default)]
pub struct CliPrompt {
    title: Option<String>,
    details: Option<String>,
    interactive: bool,
}

impl CliPrompt {
    pub fn new(title: Option<String>, details: Option<String>) -> Self {
        Self { title, details, interactive: std::io::stdin().is_terminal() }
    }

    pub fn non_interactive(title: Option<String>, details: Option<String>) -> Self {
        Self { title, details, interactive: false }
    }

    fn preset(&self, request: &InputRequest) -> Option<&String> {
        if request == &TITLE_INPUT {
            self.title.as_ref()
        } else if request == &DETAILS_INPUT {
            self.details.as_ref()
        } else {
            None
        }
    }

    fn ask(&self, request: &InputRequest) -> Option<String> {
        let prompt = match request.placeholder {
            Some(placeholder) => format!("{} ({placeholder})", request.prompt),
            None => request.prompt.to_string(),
        };

        match Input::<String>::new().with_prompt(prompt).allow_empty(true).interact_text() {
            Ok(answer) => Some(answer),
            Err(error) => {
                debug!(
                    event_name = "cli.prompt.dismissed",
                    prompt = request.prompt,
                    error = %error,
                    "prompt closed without an answer"
                );
                None
            }
        }
    }
}

impl Prompt for CliPrompt {
    fn input(&self, request: &InputRequest) -> Option<String> {
        if let Some(answer) = self.preset(request) {
            return Some(answer.clone());
        }
        if self.interactive {
            return self.ask(request);
        }
        None
    }
}
