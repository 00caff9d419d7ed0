// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the tool pages.
//
// Every technical error is mapped to plain English with a clear next step.
// The `CallerAction` tells the UI whether to re-prompt for a password, ask for
// a different file, or simply offer to try again.

use crate::error::FileZenError;

/// What the caller should offer the user after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerAction {
    /// Ask for the password again; the file itself is fine.
    ReenterPassword,
    /// Ask for a different file or fix the settings.
    ReselectInput,
    /// Nothing is wrong with the input; running the job again may work.
    TryAgain,
    /// The file cannot be processed by this tool.
    GiveUp,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Drives which buttons the result panel shows.
    pub action: CallerAction,
}

impl HumanError {
    /// Whether the password prompt should be shown again.
    pub fn reprompt_credential(&self) -> bool {
        self.action == CallerAction::ReenterPassword
    }
}

/// Convert a `FileZenError` into a `HumanError` for the result panel.
pub fn humanize_error(err: &FileZenError) -> HumanError {
    match err {
        FileZenError::InputValidation(detail) => humanize_validation(detail),

        FileZenError::CorruptDocument(_) => HumanError {
            message: "We couldn't read this file.".into(),
            suggestion: "It may be damaged or not really a PDF. Try opening it on your computer first, or choose a different file.".into(),
            action: CallerAction::ReselectInput,
        },

        FileZenError::Authentication(_) => HumanError {
            message: "That password didn't work.".into(),
            suggestion: "Check the password (it is case-sensitive) and enter it again.".into(),
            action: CallerAction::ReenterPassword,
        },

        FileZenError::Content(detail) => HumanError {
            message: "Part of this document couldn't be processed.".into(),
            suggestion: format!("The file opened, but one of its pages is unusual. Try a different file. ({detail})"),
            action: CallerAction::GiveUp,
        },

        FileZenError::Encoding(_) => HumanError {
            message: "We couldn't save the converted image.".into(),
            suggestion: "Try a different output format, such as PNG or JPG.".into(),
            action: CallerAction::ReselectInput,
        },

        FileZenError::ResourceExhausted(_) => HumanError {
            message: "This file is too large to process here.".into(),
            suggestion: "Try a smaller file, or split the document into parts first.".into(),
            action: CallerAction::ReselectInput,
        },

        FileZenError::RendererUnavailable(_) => HumanError {
            message: "The page renderer isn't ready.".into(),
            suggestion: "Wait a moment and try again. If this keeps happening, reload the page.".into(),
            action: CallerAction::TryAgain,
        },

        FileZenError::Cancelled => HumanError {
            message: "Processing was stopped.".into(),
            suggestion: "Start again whenever you're ready.".into(),
            action: CallerAction::TryAgain,
        },

        FileZenError::Io(_) => HumanError {
            message: "There was a problem reading the file.".into(),
            suggestion: "Try choosing the file again.".into(),
            action: CallerAction::ReselectInput,
        },

        FileZenError::Serialization(_) => HumanError {
            message: "The saved settings couldn't be read.".into(),
            suggestion: "Reset the settings to their defaults and try again.".into(),
            action: CallerAction::TryAgain,
        },
    }
}

/// Validation failures carry detail worth surfacing directly.
fn humanize_validation(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("at least 2") {
        HumanError {
            message: "Please select at least 2 PDF files to merge.".into(),
            suggestion: "Add another file to the list, then merge again.".into(),
            action: CallerAction::ReselectInput,
        }
    } else if lower.contains("password") {
        HumanError {
            message: "Please enter a password.".into(),
            suggestion: "A password is needed for this tool.".into(),
            action: CallerAction::ReenterPassword,
        }
    } else {
        HumanError {
            message: "Please select a valid file.".into(),
            suggestion: format!("This tool can't use that file. ({detail})"),
            action: CallerAction::ReselectInput,
        }
    }
}
