//! `send` command

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;

use super::super::{CliContext, SendArgs};
use super::stats::close_store;
use crate::dispatch::TokenReport;
use crate::gateway::Delivery;
use crate::providers::{SendOptions, SendRequest};
use crate::stats::Stats;

pub struct SendHandler<'a> {
    context: &'a CliContext,
}

/// JSON rendering of one send
#[derive(Serialize)]
struct SendSummary<'r> {
    platform: String,
    dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<&'r str>,
    total: usize,
    success: usize,
    failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    tokens: &'r [TokenReport],
}

impl<'a> SendHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    pub async fn handle_send(&self, args: SendArgs) -> Result<()> {
        let request = build_request(&args)?;
        let options = SendOptions {
            dry_run: args.dry_run,
            retry: args.retry,
            retry_interval: args.retry_interval,
        };

        let store = self.context.open_store()?;
        let outcome = async {
            let gateway = self.context.build_gateway(Stats::new(Arc::clone(&store)))?;
            gateway.deliver(&args.platform, &request, &options).await
        }
        .await;
        close_store(store.as_ref())?;

        let delivery = outcome?;
        print_delivery(&args, &request, &delivery)?;

        if let Some(err) = delivery.report.as_ref().and_then(|r| r.aggregate_error()) {
            return Err(err.into());
        }
        Ok(())
    }
}

/// Merge `--request` JSON with the individual flags; flags win
fn build_request(args: &SendArgs) -> Result<SendRequest> {
    let mut request = match &args.request {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read request file {}", path.display()))?;
            serde_json::from_str::<SendRequest>(&raw)
                .with_context(|| format!("Invalid request JSON in {}", path.display()))?
        }
        None => SendRequest::default(),
    };

    request.tokens.extend(args.tokens.iter().cloned());
    if let Some(title) = &args.title {
        request.title = title.clone();
    }
    if let Some(content) = &args.content {
        request.content = content.clone();
    }

    let overrides = [
        (&mut request.priority, &args.priority),
        (&mut request.category, &args.category),
        (&mut request.click_action, &args.click_action),
        (&mut request.icon, &args.icon),
        (&mut request.app_id, &args.app_id),
        (&mut request.app_name, &args.app_name),
    ];
    for (field, flag) in overrides {
        if flag.is_some() {
            field.clone_from(flag);
        }
    }
    if args.ttl.is_some() {
        request.ttl = args.ttl;
    }
    request.data.extend(args.data.iter().cloned());

    Ok(request)
}

fn print_delivery(args: &SendArgs, request: &SendRequest, delivery: &Delivery) -> Result<()> {
    let Some(report) = &delivery.report else {
        if args.json {
            let summary = SendSummary {
                platform: args.platform.clone(),
                dry_run: true,
                task_id: None,
                total: request.tokens.len(),
                success: 0,
                failed: 0,
                error: None,
                tokens: &[],
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!(
                "Dry run: request for {} is valid ({} token(s)), nothing sent",
                args.platform,
                request.tokens.len()
            );
        }
        return Ok(());
    };

    if args.json {
        let summary = SendSummary {
            platform: report.platform.to_string(),
            dry_run: false,
            task_id: delivery.response.task_id.as_deref(),
            total: report.total(),
            success: report.success_count(),
            failed: report.failure_count(),
            error: report.aggregate_error().map(|e| e.to_string()),
            tokens: &report.tokens,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    for token in &report.tokens {
        if token.succeeded() {
            println!("✓ {} ({} attempt(s))", token.token, token.attempts);
        } else {
            println!(
                "✗ {} ({} attempt(s)): {}",
                token.token,
                token.attempts,
                token.errors.join("; ")
            );
        }
    }
    println!(
        "{}: {} sent, {} failed",
        report.platform,
        report.success_count(),
        report.failure_count()
    );
    if let Some(task_id) = &delivery.response.task_id {
        println!("Task id: {task_id}");
    }
    Ok(())
}
