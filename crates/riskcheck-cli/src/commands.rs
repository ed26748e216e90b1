//! Subcommand handlers

use crate::{render, state};
use anyhow::{bail, Context as _};
use clap::Args;
use riskcheck_client::{Client, ClientConfig, PaymentOutcome, RefreshOutcome, ResultPage};
use riskcheck_core::intake::{income_band_label, industry_label, INDUSTRIES};
use riskcheck_core::{AssessmentInput, Flow, FlowState, MissingPrecondition, Stage, Tier};
use riskcheck_store::Scopes;
use std::path::Path;
use std::process::ExitCode;

/// Exit code for an assessment the backend does not know
const EXIT_NOT_FOUND: u8 = 2;

/// Loaded configuration, scopes and client
pub(crate) struct Context {
    client: Client,
}

impl Context {
    pub(crate) fn open(config: &ClientConfig) -> anyhow::Result<Self> {
        let scopes = state::open_scopes(config)?;
        let client = Client::from_config(config, scopes)?;
        Ok(Self { client })
    }

    fn scopes(&self) -> &Scopes {
        self.client.scopes()
    }
}

#[derive(Args)]
pub(crate) struct AssessArgs {
    /// Industry key, see `riskcheck industries`
    #[arg(long)]
    industry: String,
    /// Monthly income in euros
    #[arg(long)]
    income: f64,
    #[arg(long, default_value_t = 0)]
    employees: u32,
    /// Takes card payments through a POS terminal
    #[arg(long, default_value_t = false)]
    pos: bool,
    /// Extra yes/no answer as `code=yes|no`, repeatable
    #[arg(long = "signal", value_parser = parse_signal)]
    signals: Vec<(String, bool)>,
    /// Select this stage before submitting
    #[arg(long)]
    stage: Option<String>,
}

fn parse_signal(raw: &str) -> Result<(String, bool), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected code=yes|no, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty signal code in {raw:?}"));
    }
    let value = match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => true,
        "no" | "n" | "false" | "0" => false,
        other => return Err(format!("expected yes or no for {key}, got {other:?}")),
    };
    Ok((key.to_string(), value))
}

fn parse_stage(raw: &str) -> anyhow::Result<Stage> {
    raw.trim().to_ascii_uppercase().parse::<Stage>().with_context(|| {
        let options: Vec<_> = Stage::ALL.iter().map(Stage::as_str).collect();
        format!("choose one of {}", options.join(", "))
    })
}

pub(crate) fn industries() {
    for (key, label) in INDUSTRIES {
        println!("{key:<26} {label}");
    }
}

pub(crate) async fn show_stage(ctx: &Context) -> anyhow::Result<ExitCode> {
    let current = ctx.client.intake().current_stage().await?;
    for stage in Stage::ALL {
        let marker = if Some(stage) == current { "*" } else { " " };
        let bounds = stage.income_bounds();
        let presets: Vec<_> = stage.income_presets().iter().map(u32::to_string).collect();
        println!(
            "{marker} {:<13} income {}..{} step {} (presets: {})",
            stage.as_str(),
            bounds.min,
            bounds.max,
            bounds.step,
            presets.join(", ")
        );
    }
    if current.is_none() {
        println!("\nNo stage selected. Run `riskcheck stage <STAGE>`.");
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) async fn select_stage(ctx: &Context, raw: &str) -> anyhow::Result<ExitCode> {
    let stage = parse_stage(raw)?;
    ctx.client.intake().select_stage(stage).await?;
    println!("Stage set to {stage}");
    Ok(ExitCode::SUCCESS)
}

pub(crate) async fn assess(ctx: &Context, args: AssessArgs) -> anyhow::Result<ExitCode> {
    let intake = ctx.client.intake();
    if let Some(raw) = &args.stage {
        intake.select_stage(parse_stage(raw)?).await?;
    }
    let Some(stage) = intake.current_stage().await? else {
        bail!("no stage selected; run `riskcheck stage <STAGE>` first");
    };

    let industry = args.industry.trim().to_ascii_lowercase();
    if industry_label(&industry).is_none() {
        bail!("unknown industry {industry:?}; see `riskcheck industries`");
    }

    let (income, clamped) = stage.income_bounds().clamp(args.income);
    if clamped {
        tracing::warn!("Income {} is outside the {stage} range; using {income}", args.income);
    }

    let mut input = AssessmentInput::new(stage, industry, income, args.employees, args.pos);
    for (key, value) in args.signals {
        input = input.with_signal(key, value);
    }

    let result = intake.submit(input).await?;
    println!(
        "Assessment {} created: score {} ({}), income band {}",
        result.id.as_deref().unwrap_or_default(),
        result.risk_score,
        result.risk_level,
        income_band_label(income)
    );
    let required = result.required_tier();
    if required.is_paid() {
        println!("Full results require {required}. Run `riskcheck result` for the summary.");
    } else {
        println!("Run `riskcheck result` to see the full result.");
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) async fn result(ctx: &Context, id: Option<&str>, json: bool) -> anyhow::Result<ExitCode> {
    let page = match ctx.client.reconciler().load_page(id, chrono::Utc::now()).await {
        Ok(page) => page,
        Err(e) if e.precondition() == Some(MissingPrecondition::AssessmentId) => {
            bail!("no assessment yet; run `riskcheck assess` first")
        }
        Err(e) => return Err(e.into()),
    };

    match page {
        ResultPage::NotFound { assessment_id } => {
            eprintln!("Assessment {assessment_id} was not found. Run `riskcheck reset` and assess again.");
            Ok(ExitCode::from(EXIT_NOT_FOUND))
        }
        ResultPage::Loading { assessment_id } => {
            eprintln!("The result for {assessment_id} is not available yet. Try again shortly.");
            Ok(ExitCode::FAILURE)
        }
        ResultPage::Ready { view, refreshed } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&*view)?);
            } else {
                print!("{}", render::result_page(&view, refreshed));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

pub(crate) async fn unlock(ctx: &Context, raw: &str) -> anyhow::Result<ExitCode> {
    let tier = Tier::normalize(Some(raw));
    let session = ctx.client.payments().start_checkout(tier).await?;
    println!("Open this link to pay:\n{}", session.checkout_url);
    if let Some(session_id) = &session.session_id {
        println!("Then run: riskcheck confirm-payment {session_id}");
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) async fn confirm_payment(ctx: &Context, session_id: &str) -> anyhow::Result<ExitCode> {
    match ctx.client.payments().confirm_payment(session_id).await? {
        PaymentOutcome::NotPaid => {
            eprintln!("Payment not confirmed yet. Finish checkout and run this again.");
            Ok(ExitCode::FAILURE)
        }
        PaymentOutcome::PaidUnlinked => {
            eprintln!("Payment received but not linked to an assessment. Contact support with {session_id}.");
            Ok(ExitCode::FAILURE)
        }
        PaymentOutcome::Unlocked {
            assessment_id,
            tier,
            refresh,
        } => {
            println!("Unlocked {tier} for assessment {assessment_id}");
            if let RefreshOutcome::Stale { reason, .. } = refresh {
                println!("The result could not be refreshed yet ({reason:?}); `riskcheck result` will retry.");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

pub(crate) async fn report(ctx: &Context, id: Option<&str>, out: Option<&Path>) -> anyhow::Result<ExitCode> {
    let Some(assessment_id) = ctx.scopes().resolve_assessment_id(id).await? else {
        bail!("no assessment yet; run `riskcheck assess` first");
    };
    let user_id = ctx.scopes().durable.user_id().await?;
    let http = ctx.client.http();

    match out {
        Some(dest) => {
            let bytes = http
                .download_report(&assessment_id, user_id.as_deref(), dest)
                .await
                .with_context(|| format!("downloading report for {assessment_id}"))?;
            println!("Saved {} ({bytes} bytes)", dest.display());
        }
        None => println!("{}", http.report_url(&assessment_id, user_id.as_deref())),
    }
    Ok(ExitCode::SUCCESS)
}

/// Offline view of the flow position from cached state
async fn flow_position(scopes: &Scopes) -> anyhow::Result<Flow> {
    let mut flow = Flow::start(scopes.durable.stage().await?.is_some());
    if flow.state() != FlowState::NeedsForm {
        return Ok(flow);
    }
    let Some(id) = scopes.resolve_assessment_id(None).await? else {
        return Ok(flow);
    };
    let Some(result) = scopes.session.result().await? else {
        return Ok(flow);
    };
    flow.advance(FlowState::HasResult)?;
    flow.apply_gate(result.required_tier(), scopes.cached_tier(&id).await?)?;
    Ok(flow)
}

pub(crate) async fn flow(ctx: &Context) -> anyhow::Result<ExitCode> {
    let flow = flow_position(ctx.scopes()).await?;
    let path: Vec<_> = flow.history().iter().map(|s| format!("{s:?}")).collect();
    println!("{}", path.join(" -> "));
    let hint = match flow.state() {
        FlowState::NeedsStage => "riskcheck stage <STAGE>",
        FlowState::NeedsForm => "riskcheck assess --industry <KEY> --income <EUR>",
        FlowState::Locked => "riskcheck unlock basic_15",
        _ => "riskcheck result",
    };
    println!("Next: {hint}");
    Ok(ExitCode::SUCCESS)
}

pub(crate) async fn reset(ctx: &Context) -> anyhow::Result<ExitCode> {
    ctx.scopes().clear_assessment().await?;
    println!("Forgot the current assessment");
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskcheck_test_utils::bar_result;

    #[test]
    fn signals_parse() {
        assert_eq!(parse_signal("serves_alcohol=yes").unwrap(), ("serves_alcohol".to_string(), true));
        assert_eq!(parse_signal(" cash_only = No ").unwrap(), ("cash_only".to_string(), false));
        assert!(parse_signal("cash_only").is_err());
        assert!(parse_signal("=yes").is_err());
        assert!(parse_signal("cash_only=maybe").is_err());
    }

    #[test]
    fn stages_parse_case_insensitively() {
        assert_eq!(parse_stage("autonomo").unwrap(), Stage::Autonomo);
        assert_eq!(parse_stage("SL").unwrap(), Stage::Sl);
        let err = parse_stage("freelancer").unwrap_err();
        assert!(format!("{err:#}").contains("PRE_AUTONOMO, AUTONOMO, SL"));
    }

    #[tokio::test]
    async fn flow_position_follows_cached_state() {
        let scopes = Scopes::in_memory();
        assert_eq!(flow_position(&scopes).await.unwrap().state(), FlowState::NeedsStage);

        scopes.durable.set_stage(Stage::Autonomo).await.unwrap();
        assert_eq!(flow_position(&scopes).await.unwrap().state(), FlowState::NeedsForm);

        scopes.remember_assessment_id("a-1").await.unwrap();
        scopes.session.set_result(&bar_result("a-1", Tier::None)).await.unwrap();
        assert_eq!(flow_position(&scopes).await.unwrap().state(), FlowState::Locked);

        scopes.persist_tier("a-1", Tier::Expert39).await.unwrap();
        let flow = flow_position(&scopes).await.unwrap();
        assert_eq!(flow.state(), FlowState::Unlocked);
        assert_eq!(
            flow.history(),
            &[FlowState::NeedsForm, FlowState::HasResult, FlowState::Unlocked]
        );
    }
}
