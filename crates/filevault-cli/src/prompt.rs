//! Decision prompts used by `sync` and `watch`

use std::io::{BufRead, Write};

use anyhow::Context;
use filevault_core::domain::{DiffResult, SyncDirection};
use filevault_core::ports::{Decision, IDecisionPrompt};

use crate::commands::diff_lines;

/// Asks on the terminal which side should win
pub struct TerminalPrompt;

/// Maps an answer typed at the prompt to a decision
pub fn parse_answer(answer: &str) -> Decision {
    match answer.trim().to_ascii_lowercase().as_str() {
        "p" | "push" => Decision::Apply(SyncDirection::LocalToRemote),
        "l" | "pull" => Decision::Apply(SyncDirection::RemoteToLocal),
        _ => Decision::Dismissed,
    }
}

#[async_trait::async_trait]
impl IDecisionPrompt for TerminalPrompt {
    async fn decide(&self, diff: &DiffResult) -> anyhow::Result<Decision> {
        let summary = diff.summary();
        let mut text = format!(
            "Drift detected ({}): {} added, {} modified, {} removed\n",
            diff.action(),
            summary.added,
            summary.modified,
            summary.removed
        );
        for line in diff_lines(diff) {
            text.push_str("  ");
            text.push_str(&line);
            text.push('\n');
        }
        text.push_str("[p]ush local, pul[l] remote, anything else to skip: ");

        let answer = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
            let mut stderr = std::io::stderr().lock();
            stderr.write_all(text.as_bytes())?;
            stderr.flush()?;

            let mut answer = String::new();
            std::io::stdin().lock().read_line(&mut answer)?;
            Ok(answer)
        })
        .await
        .context("Prompt task panicked")??;

        Ok(parse_answer(&answer))
    }
}

/// Never applies anything; used when nobody is there to answer
pub struct DismissPrompt;

#[async_trait::async_trait]
impl IDecisionPrompt for DismissPrompt {
    async fn decide(&self, _diff: &DiffResult) -> anyhow::Result<Decision> {
        Ok(Decision::Dismissed)
    }
}
