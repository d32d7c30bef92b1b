//! Load distribution statistics
//!
//! Counts documents on every node and derives per-node percentages plus a
//! balance figure (max percentage minus min percentage). A node that fails
//! to answer is reported with its error; the others are still counted.

use crate::coordinator::registry::NodeRegistry;
use serde::Serialize;

/// Balance below this many points is excellent
pub const EXCELLENT_BALANCE: f64 = 10.0;
/// Balance below this many points is good
pub const GOOD_BALANCE: f64 = 20.0;

/// Qualitative reading of the balance figure, for humans only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceBand {
    Excellent,
    Good,
    NeedsImprovement,
}

impl BalanceBand {
    pub fn classify(balance: f64) -> Self {
        if balance < EXCELLENT_BALANCE {
            BalanceBand::Excellent
        } else if balance < GOOD_BALANCE {
            BalanceBand::Good
        } else {
            BalanceBand::NeedsImprovement
        }
    }
}

impl std::fmt::Display for BalanceBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BalanceBand::Excellent => write!(f, "excellent"),
            BalanceBand::Good => write!(f, "good"),
            BalanceBand::NeedsImprovement => write!(f, "needs improvement"),
        }
    }
}

/// Load of a single node
#[derive(Debug, Clone, Serialize)]
pub struct NodeLoad {
    pub index: usize,
    pub address: String,
    /// `None` when the node could not be counted
    pub count: Option<u64>,
    pub percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionReport {
    pub nodes: Vec<NodeLoad>,
    pub total: u64,
    pub balance: f64,
    pub band: BalanceBand,
}

impl DistributionReport {
    /// True when every node reported a count
    pub fn is_complete(&self) -> bool {
        self.nodes.iter().all(|n| n.error.is_none())
    }
}

/// Read-only aggregation over a registry
pub struct StatsReporter<'a> {
    registry: &'a NodeRegistry,
}

impl<'a> StatsReporter<'a> {
    pub fn new(registry: &'a NodeRegistry) -> Self {
        Self { registry }
    }

    pub fn report(&self) -> DistributionReport {
        let mut nodes: Vec<NodeLoad> = self
            .registry
            .slots()
            .iter()
            .map(|slot| {
                let counted = self
                    .registry
                    .handle(slot.index())
                    .and_then(|handle| handle.count_all());
                let (count, error) = match counted {
                    Ok(count) => (Some(count), None),
                    Err(e) => {
                        tracing::warn!("Could not count node {}: {}", slot.index(), e);
                        (None, Some(e.to_string()))
                    }
                };
                NodeLoad {
                    index: slot.index(),
                    address: slot.address().to_string(),
                    count,
                    percentage: 0.0,
                    error,
                }
            })
            .collect();

        let total: u64 = nodes.iter().filter_map(|n| n.count).sum();

        if total > 0 {
            for node in &mut nodes {
                if let Some(count) = node.count {
                    node.percentage = count as f64 / total as f64 * 100.0;
                }
            }
        }

        let balance = if total > 0 {
            let counted = nodes.iter().filter(|n| n.count.is_some());
            let max = counted
                .clone()
                .map(|n| n.percentage)
                .fold(f64::MIN, f64::max);
            let min = counted.map(|n| n.percentage).fold(f64::MAX, f64::min);
            max - min
        } else {
            0.0
        };

        tracing::debug!("Distribution: {} documents, balance {:.2}", total, balance);

        DistributionReport {
            nodes,
            total,
            balance,
            band: BalanceBand::classify(balance),
        }
    }
}

impl std::fmt::Display for DistributionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{}", rule)?;
        writeln!(f, "DISTRIBUTION STATISTICS")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Total documents: {}", self.total)?;
        writeln!(f, "Nodes: {}", self.nodes.len())?;
        writeln!(f, "{}", "-".repeat(60))?;

        for node in &self.nodes {
            writeln!(f, "Node {}: {}", node.index, node.address)?;
            match (&node.count, &node.error) {
                (Some(count), _) => {
                    writeln!(f, "  Documents:  {}", count)?;
                    writeln!(f, "  Percentage: {:.2}%", node.percentage)?;
                    // 50 characters at 100%
                    writeln!(f, "  {}", "█".repeat((node.percentage / 2.0) as usize))?;
                }
                (None, Some(error)) => writeln!(f, "  Error: {}", error)?,
                (None, None) => writeln!(f, "  Error: unknown")?,
            }
        }

        if self.total > 0 {
            writeln!(f, "{}", "-".repeat(60))?;
            writeln!(
                f,
                "Balance: {} (difference: {:.2}%)",
                self.band, self.balance
            )?;
        }
        write!(f, "{}", rule)
    }
}
