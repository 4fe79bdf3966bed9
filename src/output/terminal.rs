// Colored terminal output for one-off classifications and run summaries.
//
// This module handles all terminal-specific formatting. The main.rs command
// handlers delegate here.

use colored::{ColoredString, Colorize};

use crate::classifier::Verdict;
use crate::pipeline::RunSummary;

use super::truncate_chars;

/// Color a verdict by severity.
pub fn colorize_verdict(verdict: Verdict) -> ColoredString {
    match verdict {
        Verdict::Scam => verdict.as_str().red().bold(),
        Verdict::ShillingCrypto | Verdict::BotActivity => verdict.as_str().bright_red(),
        Verdict::FomoInducer | Verdict::Potential => verdict.as_str().yellow(),
        Verdict::Benign => verdict.as_str().green(),
    }
}

/// Display the result of `cinder classify`.
///
/// `term` is None when the matcher found nothing, in which case the
/// classifier was still run but a live pipeline would have stopped early.
pub fn display_classification(text: &str, term: Option<&str>, verdict: Verdict) {
    let policy = verdict.policy();

    println!("\n{}", "=== Classification ===".bold());
    println!("  Text:     {}", truncate_chars(text, 100).dimmed());
    match term {
        Some(term) => println!("  Term:     {}", term.cyan()),
        None => println!(
            "  Term:     {} {}",
            "none".dimmed(),
            "(pipeline would skip this post)".dimmed()
        ),
    }
    println!("  Verdict:  {}", colorize_verdict(verdict));
    println!(
        "  Label:    {}",
        policy.label.unwrap_or("none")
    );
    match policy.ignore_days {
        Some(days) => println!("  Ignore:   {days} day(s)"),
        None => println!("  Ignore:   none"),
    }
    println!();
}

/// Display totals after `cinder run` finishes.
pub fn display_run_summary(summary: &RunSummary) {
    println!("\n{}", "=== Run Summary ===".bold());
    println!("  Events received:      {}", summary.events_received);
    println!("  Classified:           {}", summary.classified);
    println!("  Labeled (classifier): {}", summary.labeled_by_classifier);
    println!("  Windows processed:    {}", summary.windows_completed);
    if summary.windows_dropped > 0 {
        println!(
            "  Windows dropped:      {}",
            summary.windows_dropped.to_string().yellow()
        );
    }
    println!("  Window label calls:   {}", summary.window_label_attempts);
    if summary.escalations > 0 {
        println!(
            "  Escalated accounts:   {}",
            summary.escalations.to_string().red().bold()
        );
    }
    if summary.discarded_on_shutdown > 0 {
        println!(
            "  {} {} buffered events discarded at shutdown",
            "~".yellow(),
            summary.discarded_on_shutdown
        );
    }
    println!();
}
