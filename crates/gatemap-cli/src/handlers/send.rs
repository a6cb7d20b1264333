//! Send command handler

use super::utils::{build_gateway, cancel_on_ctrl_c, load_integration, read_file};
use crate::cli::SendArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::{OutputWriter, RunReport};
use gatemap_core::pipeline::behaviors::AuthenticationBehavior;
use gatemap_core::{default_behaviors, Gateway, HttpDispatcher, HttpTokenSource, RetryPolicy, TokenCache};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Handle the send command
#[instrument(skip(config, output), fields(integration = %args.integration.display(), endpoint = %args.endpoint))]
pub async fn handle_send(args: SendArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let _timer = Timer::with_details("send_command", &args.endpoint);

    let definition = load_integration(&args.integration)?;
    let input = read_file(&args.input)?;
    let gateway = build_gateway(definition, config, args.policy.map(Into::into))?;
    let gateway = with_downstream(gateway, &args, config)?;

    let spinner = output.spinner(&format!("Sending to {}...", args.endpoint));
    let outcome = gateway.handle(&input, cancel_on_ctrl_c()).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let outcome = outcome.map_err(|e| match e {
        gatemap_core::Error::Http {
            status_code: Some(status),
            ..
        } if (400..600).contains(&status) => Error::Rejected { status },
        other => Error::Core(other),
    })?;

    let report = RunReport::from_outcome(&gateway.definition().name, &outcome, args.pretty)?;
    info!(
        request_id = %report.request_id,
        success = report.is_success,
        status = report.receipt.as_ref().map(|r| r.status),
        "Send command finished"
    );
    output.run_report(&report)?;

    if report.is_success {
        Ok(())
    } else {
        Err(Error::MappingFailed(
            report.error_message.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

/// Attach the HTTP dispatcher and, when requested, token acquisition
fn with_downstream(gateway: Gateway, args: &SendArgs, config: &Config) -> Result<Gateway> {
    let timeout = args
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.dispatch.timeout());
    let retries = args.retries.unwrap_or(config.dispatch.max_retries);

    let dispatcher = HttpDispatcher::with_timeout(&args.endpoint, timeout)?
        .with_retry(RetryPolicy::new(retries))
        .with_pretty(args.pretty);
    let gateway = gateway.with_dispatcher(Arc::new(dispatcher));

    if !args.auth {
        return Ok(gateway);
    }

    let auth = &config.auth;
    let mut auth_settings = auth.clone();
    if let Some(token_url) = &args.token_url {
        auth_settings.token_url = Some(token_url.clone());
    }
    let (token_url, client_id, client_secret) = auth_settings.credentials()?;

    let mut source = HttpTokenSource::new(token_url, client_id, client_secret)?;
    if let Some(scope) = &auth.scope {
        source = source.with_scope(scope.clone());
    }
    let cache = Arc::new(TokenCache::new().with_skew(auth.expiry_skew()));
    let behavior = AuthenticationBehavior::new(auth.cache_key.clone(), Arc::new(source));

    Ok(gateway
        .with_service(cache)
        .with_behaviors(default_behaviors().pre_run(Arc::new(behavior))))
}
