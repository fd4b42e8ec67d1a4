//! Terminal rendering for rigdocctl. ASCII only; color is optional.

use owo_colors::OwoColorize;
use rigdoc_shared::case_store::CaseRecord;
use rigdoc_shared::cbr::is_candidate;
use rigdoc_shared::certainty::interpret_cf_level;
use rigdoc_shared::config::ColorMode;
use rigdoc_shared::learning::{FeedbackOutcome, SaveOutcome};
use rigdoc_shared::meta::Primary;
use rigdoc_shared::questionnaire::{questions, NOT_SURE_LABEL};
use rigdoc_shared::session::DiagnosisReport;
use std::io::IsTerminal;

const HR: &str = "------------------------------------------------------------";

/// Applies color only when enabled.
#[derive(Debug, Clone, Copy)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn from_mode(mode: ColorMode) -> Self {
        let enabled = match mode {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => {
                std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
            }
        };
        Self { enabled }
    }

    pub fn header(&self, s: &str) -> String {
        if self.enabled {
            s.bold().to_string()
        } else {
            s.to_string()
        }
    }

    pub fn ok(&self, s: &str) -> String {
        if self.enabled {
            s.bright_green().to_string()
        } else {
            s.to_string()
        }
    }

    pub fn warn(&self, s: &str) -> String {
        if self.enabled {
            s.yellow().to_string()
        } else {
            s.to_string()
        }
    }

    pub fn bad(&self, s: &str) -> String {
        if self.enabled {
            s.bright_red().to_string()
        } else {
            s.to_string()
        }
    }

    pub fn dim(&self, s: &str) -> String {
        if self.enabled {
            s.dimmed().to_string()
        } else {
            s.to_string()
        }
    }
}

/// Reliability tag for a 0-100 confidence.
pub fn confidence_tag(percent: f64) -> &'static str {
    if percent > 70.0 {
        "[HIGH]"
    } else if percent > 40.0 {
        "[MEDIUM]"
    } else {
        "[LOW]"
    }
}

fn painted_tag(p: &Painter, percent: f64) -> String {
    let tag = confidence_tag(percent);
    if percent > 70.0 {
        p.ok(tag)
    } else if percent > 40.0 {
        p.warn(tag)
    } else {
        p.bad(tag)
    }
}

pub fn print_questions(p: &Painter) {
    for q in questions() {
        println!("{}  {}", p.header(q.category.as_str()), q.prompt);
        for (label, id, _) in q.options {
            println!("    {:<28} {}", label, p.dim(&format!("-> {}", id)));
        }
        println!("    {}", p.dim(NOT_SURE_LABEL));
    }
}

pub fn print_report(report: &DiagnosisReport, p: &Painter) {
    let res = &report.resolution;

    if !report.unanswered.is_empty() {
        println!(
            "{} Please complete all selections for a better diagnosis ({} unanswered: {})",
            p.warn("[NOTE]"),
            report.unanswered.len(),
            report.unanswered.join(", ")
        );
        println!();
    }

    println!("{}", p.header("[DIAGNOSIS]"));
    println!("{}", HR);
    println!(
        "{}  {} via {} ({:.0}%)",
        painted_tag(p, res.confidence),
        p.header(&res.recommendation),
        res.primary.as_str(),
        res.confidence
    );
    println!("  {}", res.reason);

    if let Some(alt) = &res.alternative_solution {
        println!();
        let label = if res.requires_comparison {
            "[COMPARE]"
        } else {
            "[ALTERNATIVE]"
        };
        println!(
            "{} {} ({:.0}%)",
            p.warn(label),
            alt,
            res.alternative_confidence.unwrap_or(0.0)
        );
        if let Some(reason) = &res.alternative_reason {
            println!("  {}", reason);
        }
    }

    if let Some(err) = &report.rbr_error {
        println!();
        println!("{} Rule engine unavailable: {}", p.bad("[WARNING]"), err);
    }

    if let Some(rbr) = &report.rbr {
        if let Some(top) = &rbr.primary {
            println!();
            println!("{}", p.header("[RULES]"));
            println!(
                "  {} ({:.0}%, {})",
                top.fault,
                top.percent(),
                interpret_cf_level(top.cf)
            );
            if !top.citation.is_empty() {
                println!("  {}", p.dim(&format!("source: {}", top.citation)));
            }
            for alt in &rbr.alternatives {
                println!("  also possible: {} ({:.0}%)", alt.fault, alt.percent());
            }
        }
    }

    let evidence = report.explanation();
    if !evidence.is_empty() {
        println!();
        println!("{}", p.header("[EVIDENCE]"));
        for s in evidence {
            println!("  * {}:{} (cf {:.2})", s.name, s.value, s.cf);
        }
    }

    if let Some(m) = &report.cbr {
        println!();
        println!("{}", p.header("[SIMILAR CASE]"));
        println!(
            "  {} {} {:.0}% ({} match)",
            m.case.id,
            m.case.status,
            m.score,
            m.quality.label()
        );
        println!("  {}", m.case.solution);
    }

    if res.primary == Primary::None {
        println!();
        println!(
            "{} Found the fix yourself? Share it with: rigdocctl submit --answer ... --solution \"...\"",
            p.dim("[TIP]")
        );
    }
}

pub fn print_cases(cases: &[CaseRecord], show_all: bool, p: &Painter) {
    let shown: Vec<&CaseRecord> = cases
        .iter()
        .filter(|c| show_all || is_candidate(c))
        .collect();

    if shown.is_empty() {
        println!("No cases in the library.");
        return;
    }

    for c in &shown {
        let status = if c.is_verified() {
            p.ok(c.status.as_str())
        } else {
            p.warn(c.status.as_str())
        };
        let hidden = if is_candidate(c) {
            String::new()
        } else {
            format!(" {}", p.bad("[EXCLUDED]"))
        };
        println!(
            "{}  {:<8} {:>+3}{}  {}",
            p.header(&c.id),
            status,
            c.feedback_score,
            hidden,
            c.solution
        );
        let features: Vec<String> = c.features.iter().map(|t| t.to_string()).collect();
        println!("        {}", p.dim(&features.join(" ")));
    }

    let hidden = cases.len() - shown.len();
    if hidden > 0 {
        println!();
        println!("{} downvoted case(s) hidden; use --all to show them.", hidden);
    }
}

pub fn print_save(outcome: &SaveOutcome, p: &Painter) {
    if outcome.saved {
        println!("{} {}", p.ok("[SAVED]"), outcome.message);
    } else {
        println!("{} {}", p.bad("[REJECTED]"), outcome.message);
    }
}

pub fn print_feedback(outcome: &FeedbackOutcome, p: &Painter) {
    let tag = if outcome.promoted {
        p.ok("[PROMOTED]")
    } else {
        p.header("[RECORDED]")
    };
    println!("{} {}", tag, outcome.message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_tags() {
        assert_eq!(confidence_tag(85.0), "[HIGH]");
        assert_eq!(confidence_tag(70.0), "[MEDIUM]");
        assert_eq!(confidence_tag(40.0), "[LOW]");
        assert_eq!(confidence_tag(0.0), "[LOW]");
    }

    #[test]
    fn test_plain_painter_adds_no_escapes() {
        let p = Painter::new(false);
        assert_eq!(p.ok("x"), "x");
        assert_eq!(p.bad("y"), "y");
        assert_eq!(Painter::from_mode(ColorMode::Never).header("z"), "z");
    }

    #[test]
    fn test_colored_painter_wraps_text() {
        let p = Painter::new(true);
        assert!(p.ok("x").contains('\u{1b}'));
    }
}
