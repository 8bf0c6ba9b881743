use anyhow::Context;
use clap::Args;
use serde_json::json;
use std::sync::Arc;

use crate::cli::utils::{output_detail, output_success};
use crate::cli::OutputFormat;
use crate::config::{self, MappingPolicy};
use crate::database::postgres::PgStore;
use crate::services::FrameService;

#[derive(Debug, Args)]
pub struct ResyncArgs {
    #[arg(long, help = "Only this frame; all frames when omitted")]
    pub frame: Option<i64>,

    #[arg(long, value_parser = parse_policy, help = "latest or reconcile (defaults to MAPPING_POLICY)")]
    pub policy: Option<MappingPolicy>,
}

fn parse_policy(value: &str) -> Result<MappingPolicy, String> {
    MappingPolicy::parse(value).ok_or_else(|| format!("unknown mapping policy '{}'", value))
}

pub async fn handle(args: ResyncArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let policy = args.policy.unwrap_or(config::config().mapping.policy);
    let frames = FrameService::new(Arc::new(PgStore::new()), policy);

    match args.frame {
        Some(id) => {
            let result = frames
                .resync(id)
                .await
                .with_context(|| format!("resync of frame {} failed", id))?;
            for outcome in &result.outcomes {
                output_detail(
                    output_format,
                    &format!(
                        "{}: {} created, {} relinked, {} reset, {} stale",
                        outcome.kind, outcome.created, outcome.relinked, outcome.reset, outcome.stale_reset
                    ),
                );
            }
            for warning in &result.warnings {
                output_detail(output_format, &format!("warning: {}", warning.message));
            }
            output_success(
                output_format,
                &format!("Resynced frame {} with {:?} policy", id, policy),
                Some(json!({ "mappings": result.outcomes, "warnings": result.warnings })),
            )
        }
        None => {
            let (outcomes, failures) = frames.resync_all().await?;
            for (frame_id, error) in &failures {
                output_detail(output_format, &format!("frame {} failed: {}", frame_id, error));
            }
            let created: usize = outcomes.iter().map(|o| o.created).sum();
            output_success(
                output_format,
                &format!(
                    "Resynced all frames with {:?} policy: {} mappings created, {} frames failed",
                    policy,
                    created,
                    failures.len()
                ),
                Some(json!({ "mappings": outcomes, "failed_frames": failures.iter().map(|(id, _)| id).collect::<Vec<_>>() })),
            )
        }
    }
}
