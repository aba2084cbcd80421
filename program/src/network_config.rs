// Lottery Program - Per-cluster deployment parameters
use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::{state::LotteryConfig, utils::sol_to_lamports};

/// Clusters the lottery can be deployed to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cluster {
    Localnet,
    Devnet,
    Testnet,
    MainnetBeta,
}

/// Clusters where the mock coordinator is deployed alongside the lottery
pub const DEVELOPMENT_CLUSTERS: [Cluster; 1] = [Cluster::Localnet];

impl Cluster {
    pub fn is_development(&self) -> bool {
        DEVELOPMENT_CLUSTERS.contains(self)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Cluster::Localnet => "localnet",
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::MainnetBeta => "mainnet-beta",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Cluster {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "mainnet-beta" | "mainnet" => Ok(Cluster::MainnetBeta),
            _ => Err(ConfigError::UnknownCluster(s.to_string())),
        }
    }
}

/// Errors building deployment parameters
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ConfigError {
    #[error("Unknown cluster: {0}")]
    UnknownCluster(String),
    #[error("No gas lane configured for {0}")]
    MissingGasLane(Cluster),
    #[error("A subscription id is required on {0}")]
    MissingSubscription(Cluster),
}

/// Gas lane used against the mock coordinator, which ignores it
pub const LOCAL_GAS_LANE: [u8; 32] = [0x47; 32];

/// Deployment parameters of one cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    pub cluster: Cluster,
    pub entrance_fee: u64,
    pub interval: u64,
    pub callback_gas_limit: u32,
    /// Confirmations to wait for after deployment
    pub block_confirmations: u8,
    pub gas_lane: Option<[u8; 32]>,
}

pub fn network_config(cluster: Cluster) -> NetworkConfig {
    match cluster {
        Cluster::Localnet => NetworkConfig {
            cluster,
            entrance_fee: sol_to_lamports(0.01),
            interval: 30,
            callback_gas_limit: 500_000,
            block_confirmations: 1,
            gas_lane: Some(LOCAL_GAS_LANE),
        },
        Cluster::Devnet | Cluster::Testnet => NetworkConfig {
            cluster,
            entrance_fee: sol_to_lamports(0.01),
            interval: 30,
            callback_gas_limit: 500_000,
            block_confirmations: 6,
            gas_lane: None,
        },
        Cluster::MainnetBeta => NetworkConfig {
            cluster,
            entrance_fee: sol_to_lamports(0.1),
            interval: 3600,
            callback_gas_limit: 500_000,
            block_confirmations: 32,
            gas_lane: None,
        },
    }
}

/// Build the `Initialize` parameters for `cluster`.
///
/// Live clusters need an existing subscription and a gas lane, either from
/// the table or from `gas_lane_override`.
pub fn deploy_params(
    cluster: Cluster,
    subscription_id: u64,
    gas_lane_override: Option<[u8; 32]>,
) -> Result<LotteryConfig, ConfigError> {
    let config = network_config(cluster);
    if subscription_id == 0 && !cluster.is_development() {
        return Err(ConfigError::MissingSubscription(cluster));
    }
    let gas_lane = gas_lane_override
        .or(config.gas_lane)
        .ok_or(ConfigError::MissingGasLane(cluster))?;

    Ok(LotteryConfig {
        entrance_fee: config.entrance_fee,
        interval: config.interval,
        gas_lane,
        subscription_id,
        callback_gas_limit: config.callback_gas_limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_localnet_is_development() {
        assert!(Cluster::Localnet.is_development());
        assert!(!Cluster::Devnet.is_development());
        assert!(!Cluster::MainnetBeta.is_development());
    }

    #[test]
    fn test_parse_cluster() {
        assert_eq!("localhost".parse::<Cluster>(), Ok(Cluster::Localnet));
        assert_eq!("Mainnet-Beta".parse::<Cluster>(), Ok(Cluster::MainnetBeta));
        assert_eq!(
            "goerli".parse::<Cluster>(),
            Err(ConfigError::UnknownCluster("goerli".to_string()))
        );
    }

    #[test]
    fn test_localnet_params() {
        let params = deploy_params(Cluster::Localnet, 1, None).unwrap();
        assert_eq!(params.entrance_fee, 10_000_000);
        assert_eq!(params.interval, 30);
        assert_eq!(params.gas_lane, LOCAL_GAS_LANE);
        assert_eq!(params.subscription_id, 1);
    }

    #[test]
    fn test_live_cluster_requires_gas_lane_and_subscription() {
        assert_eq!(
            deploy_params(Cluster::Devnet, 0, Some([1; 32])),
            Err(ConfigError::MissingSubscription(Cluster::Devnet))
        );
        assert_eq!(
            deploy_params(Cluster::Devnet, 5, None),
            Err(ConfigError::MissingGasLane(Cluster::Devnet))
        );
        let params = deploy_params(Cluster::Devnet, 5, Some([1; 32])).unwrap();
        assert_eq!(params.gas_lane, [1; 32]);
    }
}
