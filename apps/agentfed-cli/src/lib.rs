//! Command-line binding over [`FederatedSearch`]. Every command prints JSON to stdout.

use std::path::PathBuf;

use clap::{
	Parser, Subcommand,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use agentfed_config::Config;
use agentfed_domain::{
	AgentField, AgentId, FeedbackCriteria, FilterSpec, SortKey, SortSpec, SourceId,
};
use agentfed_service::{FederatedSearch, FeedbackSearch, ReputationSearch, SearchRequest};

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab", styles = styles())]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Search agents across every selected source.
	Search(SearchArgs),
	/// Search agents constrained by the feedback they received.
	Reputation(ReputationArgs),
	/// Look one agent up by `<sourceId>:<tokenId>`.
	Agent { id: AgentId },
	/// Search raw feedback records.
	Feedback(FeedbackArgs),
	/// Summarize one agent's feedback.
	Summary {
		id: AgentId,
		#[arg(long)]
		tag1: Option<String>,
		#[arg(long)]
		tag2: Option<String>,
	},
}

#[derive(Debug, Clone, clap::Args)]
pub struct SearchArgs {
	/// Case-insensitive substring of the agent name.
	#[arg(long)]
	pub name: Option<String>,
	#[arg(long)]
	pub description: Option<String>,
	#[arg(long = "owner", value_name = "ADDRESS")]
	pub owners: Vec<String>,
	#[arg(long = "operator", value_name = "ADDRESS")]
	pub operators: Vec<String>,
	#[arg(long)]
	pub ens: Option<String>,
	#[arg(long)]
	pub did: Option<String>,
	#[arg(long, value_name = "ADDRESS")]
	pub wallet: Option<String>,
	#[arg(long)]
	pub mcp: Option<bool>,
	#[arg(long)]
	pub a2a: Option<bool>,
	#[arg(long)]
	pub active: Option<bool>,
	#[arg(long)]
	pub x402: Option<bool>,
	#[arg(long = "trust")]
	pub trusts: Vec<String>,
	#[arg(long = "a2a-skill")]
	pub a2a_skills: Vec<String>,
	#[arg(long = "mcp-tool")]
	pub mcp_tools: Vec<String>,
	/// `field[:asc|desc]`, repeatable. Defaults to `createdAt:desc`.
	#[arg(long = "sort", value_name = "KEY")]
	pub sort: Vec<SortKey>,
	#[arg(long, value_name = "N")]
	pub page_size: Option<u32>,
	#[arg(long)]
	pub cursor: Option<String>,
	#[arg(long = "source", value_name = "ID")]
	pub sources: Vec<SourceId>,
	#[arg(long, value_name = "MS")]
	pub timeout_ms: Option<u64>,
}
impl SearchArgs {
	pub fn filters(&self) -> FilterSpec {
		let mut filters = FilterSpec::new();

		if let Some(name) = &self.name {
			filters = filters.name_contains(name);
		}
		if let Some(description) = &self.description {
			filters = filters.description_contains(description);
		}
		if !self.owners.is_empty() {
			filters = filters.owners_in(&self.owners);
		}
		if !self.operators.is_empty() {
			filters = filters.operators_any(&self.operators);
		}
		if let Some(ens) = &self.ens {
			filters = filters.ens(ens);
		}
		if let Some(did) = &self.did {
			filters = filters.did(did);
		}
		if let Some(wallet) = &self.wallet {
			filters = filters.wallet_address(wallet);
		}

		for (field, value) in [
			(AgentField::Mcp, self.mcp),
			(AgentField::A2a, self.a2a),
			(AgentField::Active, self.active),
			(AgentField::X402Support, self.x402),
		] {
			if let Some(value) = value {
				filters = filters.flag(field, value);
			}
		}
		for (field, values) in [
			(AgentField::SupportedTrusts, &self.trusts),
			(AgentField::A2aSkills, &self.a2a_skills),
			(AgentField::McpTools, &self.mcp_tools),
		] {
			if !values.is_empty() {
				filters = filters.any_of(field, values);
			}
		}

		filters
	}

	pub fn into_request(self) -> SearchRequest {
		SearchRequest {
			filters: self.filters(),
			sort: SortSpec::new(self.sort),
			page_size: self.page_size,
			cursor: self.cursor,
			sources: (!self.sources.is_empty()).then_some(self.sources),
			timeout_ms: self.timeout_ms,
		}
	}
}

#[derive(Debug, Clone, clap::Args)]
pub struct ReputationArgs {
	#[command(flatten)]
	pub search: SearchArgs,
	#[arg(long, value_name = "SCORE")]
	pub min_average_score: Option<i64>,
	/// Only count feedback carrying one of these tags.
	#[arg(long = "tag")]
	pub tags: Vec<String>,
	#[arg(long = "reviewer", value_name = "ADDRESS")]
	pub reviewers: Vec<String>,
	#[arg(long = "agent", value_name = "AGENT_ID")]
	pub agents: Vec<AgentId>,
	#[arg(long)]
	pub include_revoked: bool,
}
impl ReputationArgs {
	pub fn into_request(self) -> ReputationSearch {
		ReputationSearch {
			search: self.search.into_request(),
			feedback: FeedbackCriteria {
				agents: self.agents,
				reviewers: self.reviewers,
				include_revoked: self.include_revoked,
				..Default::default()
			},
			tags: self.tags,
			min_average_score: self.min_average_score,
		}
	}
}

#[derive(Debug, Clone, clap::Args)]
pub struct FeedbackArgs {
	#[arg(long = "agent", value_name = "AGENT_ID")]
	pub agents: Vec<AgentId>,
	#[arg(long = "reviewer", value_name = "ADDRESS")]
	pub reviewers: Vec<String>,
	#[arg(long = "capability")]
	pub capabilities: Vec<String>,
	#[arg(long = "skill")]
	pub skills: Vec<String>,
	#[arg(long = "task")]
	pub tasks: Vec<String>,
	#[arg(long = "name")]
	pub names: Vec<String>,
	#[arg(long, value_name = "SCORE")]
	pub min_score: Option<i64>,
	#[arg(long, value_name = "SCORE")]
	pub max_score: Option<i64>,
	#[arg(long)]
	pub include_revoked: bool,
	#[arg(long = "tag")]
	pub tags: Vec<String>,
	#[arg(long, value_name = "N")]
	pub limit: Option<u32>,
	#[arg(long = "source", value_name = "ID")]
	pub sources: Vec<SourceId>,
	#[arg(long, value_name = "MS")]
	pub timeout_ms: Option<u64>,
}
impl FeedbackArgs {
	pub fn into_request(self) -> FeedbackSearch {
		FeedbackSearch {
			criteria: FeedbackCriteria {
				agents: self.agents,
				reviewers: self.reviewers,
				capabilities: self.capabilities,
				skills: self.skills,
				tasks: self.tasks,
				names: self.names,
				min_score: self.min_score,
				max_score: self.max_score,
				include_revoked: self.include_revoked,
			},
			tags: self.tags,
			limit: self.limit,
			sources: (!self.sources.is_empty()).then_some(self.sources),
			timeout_ms: self.timeout_ms,
		}
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = agentfed_config::load(&args.config)?;
	init_tracing(&config)?;
	tracing::debug!(sources = config.sources.len(), "Configuration loaded.");

	let search = FederatedSearch::new(config);
	let output: Value = match args.command {
		Command::Search(args) => serde_json::to_value(search.search(args.into_request()).await?)?,
		Command::Reputation(args) =>
			serde_json::to_value(search.search_by_reputation(args.into_request()).await?)?,
		Command::Agent { id } => serde_json::to_value(search.get_agent(&id).await?)?,
		Command::Feedback(args) =>
			serde_json::to_value(search.search_feedback(args.into_request()).await?)?,
		Command::Summary { id, tag1, tag2 } => serde_json::to_value(
			search.reputation_summary(&id, tag1.as_deref(), tag2.as_deref()).await?,
		)?,
	};

	println!("{}", serde_json::to_string_pretty(&output)?);

	Ok(())
}

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

fn init_tracing(config: &Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use agentfed_domain::{SortDirection, SortField};

	fn parse(argv: &[&str]) -> Command {
		let args = Args::try_parse_from(argv).expect("failed to parse arguments");

		assert_eq!(args.config, PathBuf::from("agentfed.toml"));

		args.command
	}

	#[test]
	fn search_flags_become_filters() {
		let Command::Search(args) = parse(&[
			"agentfed",
			"-c",
			"agentfed.toml",
			"search",
			"--name",
			"atlas",
			"--mcp",
			"true",
			"--owner",
			"0xAbC",
			"--trust",
			"reputation",
			"--sort",
			"name:asc",
			"--source",
			"84532",
			"--source",
			"11155111",
		]) else {
			panic!("Expected the search command.");
		};
		let req = args.into_request();

		assert_eq!(req.filters.len(), 4);
		assert_eq!(req.sort.primary(), Some(SortKey::new(SortField::Name, SortDirection::Asc)));
		assert_eq!(req.sources, Some(vec![SourceId(84532), SourceId(11155111)]));
	}

	#[test]
	fn omitted_sources_mean_every_source() {
		let Command::Search(args) = parse(&["agentfed", "-c", "agentfed.toml", "search"]) else {
			panic!("Expected the search command.");
		};
		let req = args.into_request();

		assert!(req.filters.is_empty());
		assert_eq!(req.sources, None);
		assert_eq!(req.sort, SortSpec::default());
	}

	#[test]
	fn reputation_flags_fill_feedback_criteria() {
		let Command::Reputation(args) = parse(&[
			"agentfed",
			"-c",
			"agentfed.toml",
			"reputation",
			"--min-average-score",
			"70",
			"--tag",
			"latency",
			"--agent",
			"84532:7",
		]) else {
			panic!("Expected the reputation command.");
		};
		let req = args.into_request();

		assert_eq!(req.min_average_score, Some(70));
		assert_eq!(req.tags, vec!["latency".to_string()]);
		assert_eq!(req.feedback.agents, vec![AgentId::new(SourceId(84532), "7")]);
	}

	#[test]
	fn malformed_agent_ids_are_rejected() {
		let parsed = Args::try_parse_from(["agentfed", "-c", "agentfed.toml", "agent", "seven"]);

		assert!(parsed.is_err());
	}
}
