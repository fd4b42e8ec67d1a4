//! Command handlers. Each returns the process exit code.

use crate::cli::{parse_assignment, Cli, Commands, VoteDirection};
use crate::display::{self, Painter};
use crate::errors::{EXIT_REJECTED, EXIT_SUCCESS};
use anyhow::{Context as _, Result};
use rigdoc_shared::case_store::CaseStore;
use rigdoc_shared::certainty::{interpret_cf_level, interpret_user_confidence};
use rigdoc_shared::config::DiagConfig;
use rigdoc_shared::features::SymptomCategory;
use rigdoc_shared::questionnaire::questions;
use rigdoc_shared::session::{Diagnostician, SessionContext};
use std::path::PathBuf;
use tracing::debug;

/// Loaded configuration plus where it came from.
pub struct Context {
    pub config: DiagConfig,
    pub config_path: PathBuf,
    pub painter: Painter,
}

impl Context {
    pub fn load(explicit: Option<&std::path::Path>) -> Result<Self> {
        let config_path = DiagConfig::resolve_path(explicit)?;
        let config = DiagConfig::load_from(&config_path)?;
        debug!("Using config {}", config_path.display());
        Ok(Self {
            painter: Painter::from_mode(config.output.color),
            config,
            config_path,
        })
    }
}

pub fn run(cli: Cli) -> Result<i32> {
    let ctx = Context::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Questions { json } => questions_cmd(&ctx, json),
        Commands::Diagnose {
            answers,
            confidence,
            expert,
            json,
        } => diagnose(&ctx, &answers, &confidence, expert, json),
        Commands::Cases { all, json } => cases(&ctx, all, json),
        Commands::Submit {
            answers,
            solution,
            expert,
        } => submit(&ctx, &answers, &solution, expert),
        Commands::Vote {
            case_id,
            direction,
            answers,
        } => vote(&ctx, &case_id, direction, &answers),
        Commands::Cf { text } => cf(&text),
        Commands::CfLevel { value } => cf_level(value),
        Commands::Config { init } => config(&ctx, init),
    }
}

/// Build a session from `CATEGORY=LABEL` and `CATEGORY=TEXT` arguments.
pub fn build_session(
    answers: &[String],
    confidence: &[String],
    expert: bool,
) -> Result<SessionContext> {
    let mut session = if expert {
        SessionContext::expert()
    } else {
        SessionContext::new()
    };

    for raw in answers {
        let (category, label) = parse_assignment(raw)?;
        session.answer(&category, &label).with_context(|| {
            format!(
                "Run `rigdocctl questions` to see the accepted labels for '{}'",
                category
            )
        })?;
    }

    for raw in confidence {
        let (category, text) = parse_assignment(raw)?;
        if SymptomCategory::parse(&category).is_none() {
            anyhow::bail!("Unknown category '{}' in --confidence", category);
        }
        session.state_confidence(&category, &text);
    }

    Ok(session)
}

fn questions_cmd(ctx: &Context, json: bool) -> Result<i32> {
    if json {
        let list: Vec<serde_json::Value> = questions()
            .iter()
            .map(|q| {
                serde_json::json!({
                    "category": q.category.as_str(),
                    "prompt": q.prompt,
                    "labels": q.labels(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        display::print_questions(&ctx.painter);
    }
    Ok(EXIT_SUCCESS)
}

fn diagnose(
    ctx: &Context,
    answers: &[String],
    confidence: &[String],
    expert: bool,
    json: bool,
) -> Result<i32> {
    let mut session = build_session(answers, confidence, expert)?;
    let mut doc = Diagnostician::from_config(&ctx.config)?;
    let report = doc.diagnose(&mut session)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display::print_report(&report, &ctx.painter);
    }
    Ok(EXIT_SUCCESS)
}

fn cases(ctx: &Context, all: bool, json: bool) -> Result<i32> {
    let store = CaseStore::new(ctx.config.store_path());
    let records = store.read_all()?;

    if json {
        let shown: Vec<_> = records
            .iter()
            .filter(|c| all || rigdoc_shared::cbr::is_candidate(c))
            .collect();
        println!("{}", serde_json::to_string_pretty(&shown)?);
    } else {
        display::print_cases(&records, all, &ctx.painter);
    }
    Ok(EXIT_SUCCESS)
}

fn submit(ctx: &Context, answers: &[String], solution: &str, expert: bool) -> Result<i32> {
    if answers.is_empty() {
        anyhow::bail!("At least one --answer is required to record a case");
    }
    let session = build_session(answers, &[], expert)?;
    let doc = Diagnostician::from_config(&ctx.config)?;
    let outcome = doc.submit(&session, solution)?;

    display::print_save(&outcome, &ctx.painter);
    Ok(if outcome.saved { EXIT_SUCCESS } else { EXIT_REJECTED })
}

fn vote(ctx: &Context, case_id: &str, direction: VoteDirection, answers: &[String]) -> Result<i32> {
    let mut session = build_session(answers, &[], false)?;
    let mut doc = Diagnostician::from_config(&ctx.config)?;

    refresh_for_vote(&mut doc, &mut session);
    let outcome = doc.vote(&mut session, case_id, direction.as_vote())?;

    display::print_feedback(&outcome, &ctx.painter);
    Ok(EXIT_SUCCESS)
}

/// Refresh features and the top rule diagnosis for the promotion check.
/// A rule engine failure only costs the semantic points, so the vote goes on.
/// Returns whether the rules ran.
fn refresh_for_vote(doc: &mut Diagnostician, session: &mut SessionContext) -> bool {
    let (_, rbr) = doc.infer(session);
    match rbr {
        Ok(_) => true,
        Err(e) => {
            debug!("Voting without a rule diagnosis: {}", e);
            false
        }
    }
}

fn cf(text: &str) -> Result<i32> {
    let value = interpret_user_confidence(text);
    println!("{:.2} ({})", value, interpret_cf_level(value));
    Ok(EXIT_SUCCESS)
}

fn cf_level(value: f64) -> Result<i32> {
    if !value.is_finite() {
        anyhow::bail!("CF must be a finite number");
    }
    println!("{}", interpret_cf_level(value));
    Ok(EXIT_SUCCESS)
}

fn config(ctx: &Context, init: bool) -> Result<i32> {
    if init {
        if ctx.config_path.exists() {
            anyhow::bail!("{} already exists", ctx.config_path.display());
        }
        let mut fresh = DiagConfig::default();
        fresh.store.path = Some(fresh.store_path());
        fresh.save_to(&ctx.config_path)?;
        println!("Wrote {}", ctx.config_path.display());
        return Ok(EXIT_SUCCESS);
    }

    let cfg = &ctx.config;
    println!("config   {}", ctx.config_path.display());
    println!("store    {}", cfg.store_path().display());
    println!(
        "rules    {}",
        cfg.rules
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(built-in)".to_string())
    );
    println!("gaps     {}", cfg.gap_log_path().display());
    println!("color    {:?}", cfg.output.color);
    for (category, weight) in &cfg.weights {
        println!("weight   {} = {}", category, weight);
    }
    Ok(EXIT_SUCCESS)
}
