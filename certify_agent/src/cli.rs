//! Command-line interface for CertifyKit.
//!
//! Graphs are kept as JSON snapshots between invocations.
//!
//! # Examples
//!
//! Load a project directory into a snapshot:
//!
//! ```bash
//! $ certify ingest --dir ./project --out graph.json --reset
//! ```
//!
//! Mine coverage rules and list the requirements that break them:
//!
//! ```bash
//! $ certify mine --graph graph.json --min-confidence 0.8
//! ```
//!
//! Propose tests for unverified requirements and write them back:
//!
//! ```bash
//! $ certify suggest --graph graph.json --apply
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use certify_core::{Certify, GapCandidate, MemoryGraphStore, MiningConfig};
use clap::{Args, Parser, Subcommand};

use crate::bridge::RemediationBridge;
use crate::suggest::TemplateSuggestionService;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "certify", about = "Compliance gap mining over a traceability graph")]
pub struct Cli {
    #[command(subcommand)]
    pub action: Action,
}

/// Actions available via CLI.
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Load reg.txt, reqs.txt, tests.csv and risk.csv into a graph snapshot
    Ingest {
        /// Project directory holding the artifact files
        #[arg(short, long)]
        dir: PathBuf,

        /// Snapshot to create or extend
        #[arg(short, long)]
        out: PathBuf,

        /// Start from an empty graph instead of extending `out`
        #[arg(long)]
        reset: bool,
    },

    /// Mine coverage rules and report requirements that violate them
    Mine {
        #[command(flatten)]
        mining: MiningArgs,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List requirements no test verifies
    Unverified {
        /// Graph snapshot
        #[arg(short, long)]
        graph: PathBuf,
    },

    /// Propose verifying tests for gaps
    Suggest {
        #[command(flatten)]
        mining: MiningArgs,

        /// Use mining exceptions instead of unverified requirements
        #[arg(long)]
        from_mining: bool,

        /// Approve every suggestion and save the snapshot
        #[arg(long)]
        apply: bool,
    },
}

/// Graph and threshold options shared by mining commands.
#[derive(Args, Debug)]
pub struct MiningArgs {
    /// Graph snapshot
    #[arg(short, long)]
    pub graph: PathBuf,

    /// YAML mining configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub min_support: Option<f64>,

    #[arg(long)]
    pub min_confidence: Option<f64>,

    /// Report each requirement at most once
    #[arg(long)]
    pub dedup: bool,
}

impl MiningArgs {
    /// Loads the configuration file, if any, then applies flag overrides.
    pub async fn mining_config(&self) -> anyhow::Result<MiningConfig> {
        let mut config = match &self.config {
            Some(path) => MiningConfig::load(path).await?,
            None => MiningConfig::default(),
        };
        if let Some(value) = self.min_support {
            config = config.min_support(value);
        }
        if let Some(value) = self.min_confidence {
            config = config.min_confidence(value);
        }
        if self.dedup {
            config = config.dedup_by_entity(true);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Entry point for the CLI.
pub async fn run() -> anyhow::Result<()> {
    execute(Cli::parse()).await
}

/// Runs one parsed command.
pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.action {
        Action::Ingest { dir, out, reset } => {
            let store = if !reset && out.exists() {
                MemoryGraphStore::load(&out).await?
            } else {
                MemoryGraphStore::new()
            };

            println!("📥 Ingesting {}...", dir.display());
            let stats = certify_core::ingest::ingest_project(&store, &dir, reset).await?;
            store.save(&out).await?;

            println!("   Regulations: {}", stats.regulations);
            println!("   Requirements: {}", stats.requirements);
            println!("   Tests: {}", stats.tests);
            println!("   Risks: {}", stats.risks);
            println!("   New relations: {}", stats.relations);
            if stats.skipped_relations > 0 {
                println!("   Skipped relations: {}", stats.skipped_relations);
            }
            for file in &stats.skipped_files {
                println!("   Skipped file: {}", file);
            }
            println!("✅ Saved {}", out.display());
            Ok(())
        }

        Action::Mine { mining, json } => {
            let (_, certify) = open(&mining.graph, mining.mining_config().await?).await?;
            let report = certify.gaps().discover().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!("⛏️  Mined {} requirements", report.row_count);
            if let Some(reason) = report.rules.empty_reason {
                println!("   No rules: {}", reason);
                return Ok(());
            }
            for rule in &report.rules {
                println!("   {}", rule);
            }
            if report.gaps.is_empty() {
                println!("✅ No exceptions found");
            } else {
                println!("⚠️  {} exceptions:", report.gaps.len());
                for gap in &report.gaps {
                    println!(
                        "   {} violates {} (confidence {:.3})",
                        gap.entity_id, gap.violated_rule, gap.confidence
                    );
                }
            }
            Ok(())
        }

        Action::Unverified { graph } => {
            let (_, certify) = open(&graph, MiningConfig::default()).await?;
            let candidates = certify.gaps().find_unverified().await?;

            if candidates.is_empty() {
                println!("✅ Every requirement is verified");
            } else {
                println!("⚠️  {} unverified requirements:", candidates.len());
                for candidate in &candidates {
                    println!("   {}: {}", candidate.id, candidate.text);
                }
            }
            Ok(())
        }

        Action::Suggest { mining, from_mining, apply } => {
            let (store, certify) = open(&mining.graph, mining.mining_config().await?).await?;
            let candidates: Vec<GapCandidate> = if from_mining {
                certify.gaps().discover().await?.candidates()
            } else {
                certify.gaps().find_unverified().await?
            };

            let bridge = RemediationBridge::new(
                certify.store().clone(),
                Arc::new(TemplateSuggestionService::new()),
            );
            bridge.propose(&candidates).await;

            let pending = bridge.pending().await;
            println!("💡 {} suggestions:", pending.len());
            for suggestion in &pending {
                println!("   {}", suggestion);
            }

            if apply {
                let outcomes = bridge.approve_all().await;
                store.save(&mining.graph).await?;
                println!("✅ Applied {} suggestions", outcomes.len());
                let left = bridge.pending_count().await;
                if left > 0 {
                    println!("   {} left pending", left);
                }
            }
            Ok(())
        }
    }
}

async fn open(path: &Path, config: MiningConfig) -> anyhow::Result<(MemoryGraphStore, Certify)> {
    let store = MemoryGraphStore::load(path).await?;
    let certify = Certify::new(Arc::new(store.clone()), config)?;
    Ok((store, certify))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mine_flags() {
        let cli = Cli::try_parse_from([
            "certify", "mine", "--graph", "g.json", "--min-confidence", "0.8", "--dedup", "--json",
        ])
        .unwrap();
        match cli.action {
            Action::Mine { mining, json } => {
                assert_eq!(mining.graph, PathBuf::from("g.json"));
                assert_eq!(mining.min_confidence, Some(0.8));
                assert!(mining.dedup);
                assert!(json);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_parse_requires_graph() {
        assert!(Cli::try_parse_from(["certify", "unverified"]).is_err());
    }

    #[tokio::test]
    async fn test_flag_overrides() {
        let args = MiningArgs {
            graph: PathBuf::from("g.json"),
            config: None,
            min_support: Some(0.2),
            min_confidence: None,
            dedup: true,
        };
        let config = args.mining_config().await.unwrap();
        assert_eq!(config.min_support, 0.2);
        assert_eq!(config.min_confidence, 0.5);
        assert!(config.dedup_by_entity);
    }

    #[tokio::test]
    async fn test_invalid_override_rejected() {
        let args = MiningArgs {
            graph: PathBuf::from("g.json"),
            config: None,
            min_support: None,
            min_confidence: Some(1.5),
            dedup: false,
        };
        assert!(args.mining_config().await.is_err());
    }
}
