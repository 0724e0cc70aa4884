//! End-of-run console report.

use crate::models::OutputMode;
use crate::pipeline::RunSummary;
use crate::utils::truncate_for_log;
use chrono::NaiveDateTime;
use std::fmt::Write;

/// Articles listed per topic; the rest are only counted.
pub const LISTED_PER_TOPIC: usize = 10;
const RULE_WIDTH: usize = 60;
const LINK_PREVIEW_CHARS: usize = 80;

fn banner(mode: OutputMode) -> &'static str {
    match mode {
        OutputMode::Preview => "[MODE APERCU - aucune modification]",
        OutputMode::Snapshot => "[MODE VERSION - fichier daté créé]",
        OutputMode::Overwrite => "[MODE APPLY - veille.json écrasé]",
    }
}

/// Render the report printed at the end of a run.
pub fn render_report(summary: &RunSummary<'_>, now: NaiveDateTime) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let thin = "-".repeat(RULE_WIDTH * 2 / 3);
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "  RAPPORT DE VEILLE AUTOMATIQUE");
    let _ = writeln!(out, "  {}", now.format("%d/%m/%Y %H:%M:%S"));
    let _ = writeln!(out, "  {}", banner(summary.mode));
    let _ = writeln!(out, "{rule}");

    for intake in &summary.intakes {
        let _ = writeln!(out, "\n{thin}");
        if intake.skipped {
            let _ = writeln!(
                out,
                "  {} : ignoré (index {} absent du document)",
                intake.topic.label, intake.topic.target_index
            );
            let _ = writeln!(out, "{thin}");
            continue;
        }
        let _ = writeln!(
            out,
            "  {} : {} trouvés, {} nouveaux",
            intake.topic.label,
            intake.found.len(),
            intake.accepted.len()
        );
        let _ = writeln!(out, "{thin}");

        for article in intake.found.iter().take(LISTED_PER_TOPIC) {
            let marker = if intake.is_new(article) { "[NEW]" } else { "[ - ]" };
            let _ = writeln!(out, "  {marker} [{}]", article.source_name);
            let _ = writeln!(out, "        {}", article.title);
            let _ = writeln!(
                out,
                "        {}",
                article.published_date.as_deref().unwrap_or("Date inconnue")
            );
            let _ = writeln!(out, "        {}", truncate_for_log(&article.link, LINK_PREVIEW_CHARS));
        }
        if intake.found.len() > LISTED_PER_TOPIC {
            let _ = writeln!(
                out,
                "  ... et {} autres articles",
                intake.found.len() - LISTED_PER_TOPIC
            );
        }
    }

    let _ = writeln!(out, "\n{rule}");
    let _ = writeln!(out, "  TOTAL : {} nouveaux articles", summary.total_new);
    if let Some(snapshot) = &summary.snapshot {
        let name = snapshot
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let _ = writeln!(out, "  FICHIER : {name}");
        let _ = writeln!(out, "  CHEMIN  : {}", snapshot.display());
    }
    if let Some(backup) = &summary.backup {
        let _ = writeln!(out, "  BACKUP  : {}", backup.display());
    }
    if summary.mode == OutputMode::Snapshot && summary.accepted_any() {
        let _ = writeln!(out, "\n  Pour écraser veille.json, relancer avec --apply");
    }
    let _ = writeln!(out, "{rule}");
    out
}
