use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use fiirank::core::allocation::{
    AllocationRequest, BucketCounts, BucketWeights, ProfileWeights, Sizing,
};
use fiirank::core::classifier::AssetClass;
use fiirank::core::log::init_logging;
use fiirank::{AppCommand, RankScope, RiskKind};
use rust_decimal::Decimal;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// List funds by ticker with income estimates
    List {
        /// Number of funds to show (defaults to the configured top)
        #[arg(short, long, default_value_t = 0)]
        top: usize,
    },
    /// Show one fund with its score, profile and income figures
    Show {
        /// Fund ticker, e.g. HGLG11
        identifier: String,
    },
    /// Rank funds inside the benchmark yield band by P/VP and dividend yield
    Filtered {
        #[arg(short, long, default_value_t = 0)]
        top: usize,
    },
    /// Large, liquid and fairly priced funds
    Anchoring,
    /// Rank funds by score
    Rank {
        #[arg(value_enum)]
        scope: RankArg,
        #[arg(short, long, default_value_t = 0)]
        top: usize,
    },
    /// List funds by risk profile
    Risk {
        #[arg(value_enum)]
        kind: RiskArg,
        #[arg(short, long, default_value_t = 0)]
        top: usize,
    },
    /// Build a property / paper / controlled-risk portfolio
    Portfolio {
        #[command(subcommand)]
        kind: PortfolioCommands,
    },
    /// Build a portfolio split across anchor, potential and risk profiles
    Profiles {
        #[arg(long, default_value = "40")]
        anchor: Decimal,
        #[arg(long, default_value = "30")]
        potential: Decimal,
        #[arg(long, default_value = "20")]
        controlled_risk: Decimal,
        #[arg(long, default_value = "10")]
        high_risk: Decimal,
        /// Total number of funds
        #[arg(long, default_value_t = 10)]
        total: usize,
    },
}

#[derive(Subcommand)]
enum PortfolioCommands {
    /// Fixed 60/35/5 policy
    Suggested,
    /// Custom weights with an explicit count per bucket
    Custom {
        #[command(flatten)]
        weights: WeightArgs,
        #[arg(long)]
        property_count: usize,
        #[arg(long)]
        paper_count: usize,
        #[arg(long)]
        risk_count: usize,
    },
    /// Custom weights with a total split proportionally across buckets
    Split {
        #[command(flatten)]
        weights: WeightArgs,
        #[arg(long)]
        total: usize,
    },
}

#[derive(Args)]
struct WeightArgs {
    /// Property bucket weight in percent
    #[arg(long)]
    property: Decimal,
    /// Paper bucket weight in percent
    #[arg(long)]
    paper: Decimal,
    /// Controlled-risk bucket weight in percent
    #[arg(long)]
    risk: Decimal,
}

impl From<WeightArgs> for BucketWeights {
    fn from(w: WeightArgs) -> BucketWeights {
        BucketWeights {
            property: w.property,
            paper: w.paper,
            controlled_risk: w.risk,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RankArg {
    Property,
    Paper,
    Mixed,
}

#[derive(Clone, Copy, ValueEnum)]
enum RiskArg {
    Controlled,
    High,
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::List { top } => AppCommand::List { top },
            Commands::Show { identifier } => AppCommand::Show { identifier },
            Commands::Filtered { top } => AppCommand::Filtered { top },
            Commands::Anchoring => AppCommand::Anchoring,
            Commands::Rank { scope, top } => AppCommand::Rank {
                scope: match scope {
                    RankArg::Property => RankScope::Class(AssetClass::Property),
                    RankArg::Paper => RankScope::Class(AssetClass::Paper),
                    RankArg::Mixed => RankScope::Mixed,
                },
                top,
            },
            Commands::Risk { kind, top } => AppCommand::Risk {
                kind: match kind {
                    RiskArg::Controlled => RiskKind::Controlled,
                    RiskArg::High => RiskKind::High,
                },
                top,
            },
            Commands::Portfolio { kind } => match kind {
                PortfolioCommands::Suggested => AppCommand::SuggestedPortfolio,
                PortfolioCommands::Custom {
                    weights,
                    property_count,
                    paper_count,
                    risk_count,
                } => AppCommand::CustomPortfolio(AllocationRequest {
                    weights: weights.into(),
                    sizing: Sizing::Counts(BucketCounts {
                        property: property_count,
                        paper: paper_count,
                        controlled_risk: risk_count,
                    }),
                }),
                PortfolioCommands::Split { weights, total } => {
                    AppCommand::CustomPortfolio(AllocationRequest {
                        weights: weights.into(),
                        sizing: Sizing::Total(total),
                    })
                }
            },
            Commands::Profiles {
                anchor,
                potential,
                controlled_risk,
                high_risk,
                total,
            } => AppCommand::ProfilePortfolio {
                weights: ProfileWeights {
                    anchor,
                    potential,
                    controlled_risk,
                    high_risk,
                },
                total,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fiirank::cli::setup::setup(),
        Some(cmd) => fiirank::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
        if e
            .downcast_ref::<fiirank::core::Error>()
            .is_some_and(fiirank::core::Error::is_retryable)
        {
            eprintln!("The data source looks temporarily unavailable; try again in a few minutes.");
        }
    }
    result
}
