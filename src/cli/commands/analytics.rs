use crate::cli::{CommandContext, Outcome, ProjectArgs, output};
use anyhow::Result;
use clap::Args;
use gh_projects::analytics::{Aggregator, AnalyticsOptions, Period};
use gh_projects::ui::spinner::with_spinner;
use log::info;

#[derive(Args, Debug)]
pub struct AnalyticsArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
    /// Include velocity for the window: weekly, monthly or quarterly
    #[arg(long)]
    pub period: Option<Period>,
    /// Include the date range covered by item dates
    #[arg(long)]
    pub timeline: bool,
}

impl AnalyticsArgs {
    fn options(&self) -> AnalyticsOptions {
        let mut options = AnalyticsOptions::default();
        if let Some(period) = self.period {
            options = options.with_period(period);
        }
        if self.timeline {
            options = options.with_timeline();
        }
        options
    }
}

pub async fn analytics_command(args: AnalyticsArgs, ctx: &CommandContext) -> Result<Outcome> {
    let project = args.project.project_ref();
    let aggregator = Aggregator::new(ctx.client()?);

    let info = with_spinner(
        format!("Reading {}...", project),
        aggregator.aggregate(&project, &args.options()),
    )
    .await?;
    info!(
        "Analytics for {}: {} items, {} statuses",
        project,
        info.item_count,
        info.status_stats.len()
    );

    ctx.emit(&info, output::analytics)?;
    Ok(Outcome::Success)
}
