//! Static venue configuration
//!
//! Which bids exist, which venues each bid deploys into, and where each
//! protocol's chain is reachable. This is data, not logic: the tables
//! are loaded once at startup and never change while the process runs.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

use vantage_core::Protocol;

use crate::valuation::deployments::{DeploymentConfig, VaultConfig};
use crate::valuation::protocols::VenueConfig;

/// One bid: its initial ATOM commitment and the venues it deployed into.
#[derive(Debug, Clone)]
pub struct BidConfig {
    pub initial_atom_allocation: Decimal,
    pub start_timestamp: i64,
    pub venues: Vec<VenueConfig>,
}

/// Where a protocol's chain is reachable.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolEndpoints {
    /// Chain name in the primary asset registry
    pub chain: &'static str,
    /// LCD/REST base endpoint
    pub lcd: &'static str,
}

pub fn protocol_endpoints(protocol: Protocol) -> ProtocolEndpoints {
    match protocol {
        Protocol::Osmosis => ProtocolEndpoints {
            chain: "osmosis",
            lcd: "https://lcd.osmosis.zone",
        },
        Protocol::Astroport | Protocol::Duality | Protocol::Mars => ProtocolEndpoints {
            chain: "neutron",
            lcd: "https://rest-kralum.neutron-1.neutron.org",
        },
        Protocol::Nolus => ProtocolEndpoints {
            chain: "nolus",
            lcd: "https://pirin-cl.nolus.network:1317",
        },
        Protocol::Neptune => ProtocolEndpoints {
            chain: "injective",
            lcd: "https://sentry.lcd.injective.network",
        },
        Protocol::Elys => ProtocolEndpoints {
            chain: "elys",
            lcd: "https://api.elys.network",
        },
        Protocol::Ux => ProtocolEndpoints {
            chain: "umee",
            lcd: "https://umee-api.polkachu.com",
        },
    }
}

const NEUTRON_ATOM: &str = "ibc/C4CFF46FD6DE35CA4CF4CE031E643C8FDC9BA4B99AE598E9B0ED98FE3A2319F9";
const NOLUS_ST_ATOM: &str = "ibc/FCFF8B19C61677F3B78E2A5AE3B4A34A8D23858D16905F253B8438B3AFD07FF8";
const INJECTIVE_ATOM: &str = "ibc/C4CFF46FD6DE35CA4CF4CE031E643C8FDC9BA4B99AE598E9B0ED98FE3A2319F9";
const OSMOSIS_ATOM: &str = "ibc/27394FB092D2ECCD56123C74F36E4C1F926001CEADA9CA97EA622B25F41E5EB2";

pub fn bid_table() -> BTreeMap<u32, BidConfig> {
    BTreeMap::from([
        (
            24,
            BidConfig {
                initial_atom_allocation: dec!(60000),
                start_timestamp: 1735689600, // 2025-01-01
                venues: vec![
                    VenueConfig::Astroport {
                        pool_address:
                            "neutron1e22zh5p8meddxjclevuhjmfj69jxfsa8uu3jvht72rv9d8lkhves6t8veq"
                                .to_string(),
                        incentive_address:
                            "neutron173fd8wpfzyqnfnpwq2zhtgdstujrjz2wkprkjfr6gqg4gknctjyq6m3tch"
                                .to_string(),
                        address: "neutron1l9u5ceqkqyyrl3kercvlc5pt0wzafhsejp0gx2".to_string(),
                    },
                    VenueConfig::Mars {
                        credit_account_id: "2533".to_string(),
                        deposited_denom: NEUTRON_ATOM.to_string(),
                    },
                ],
            },
        ),
        (
            26,
            BidConfig {
                initial_atom_allocation: dec!(100000),
                start_timestamp: 1738368000, // 2025-02-01
                venues: vec![
                    VenueConfig::Osmosis {
                        pool_id: "1283".to_string(),
                        address: "osmo1q7uxrqvvl4wcjff6vpmq0gssn8h87ffsfmh0rg".to_string(),
                    },
                    VenueConfig::Duality {
                        pool_address:
                            "neutron1yv6xyxkpjs0fm6wvyxh2ar0seqtcucguhcrs9gzsmrqs4jmy5c0q20ay2y"
                                .to_string(),
                        active_shares: 184_467_440_737,
                    },
                    // awaiting an adapter
                    VenueConfig::Missing {
                        protocol: Protocol::Elys,
                    },
                ],
            },
        ),
        (
            31,
            BidConfig {
                initial_atom_allocation: dec!(45000),
                start_timestamp: 1743465600, // 2025-04-01
                venues: vec![
                    VenueConfig::Nolus {
                        pool_contract:
                            "nolus1qqcr7exupnymvg6m63eqwu8pd4n5x6r5t3pyyxdy7r9rpckktqvqdgrc0l"
                                .to_string(),
                        pool_token: NOLUS_ST_ATOM.to_string(),
                        address: "nolus1quc6v2nqmqvyvs0lp7ydys2mz9pjpn5v3hfy7z".to_string(),
                    },
                    VenueConfig::Neptune {
                        denom: INJECTIVE_ATOM.to_string(),
                        active_shares: 52_000_000_000,
                    },
                    VenueConfig::Missing {
                        protocol: Protocol::Ux,
                    },
                ],
            },
        ),
    ])
}

pub fn deployment_table() -> BTreeMap<u32, DeploymentConfig> {
    BTreeMap::from([(
        1,
        DeploymentConfig {
            deployment_id: 1,
            name: "ATOM/OSMO managed vault",
            description: "Concentrated-liquidity vault rebalancing the ATOM/OSMO pair",
            start_timestamp: 1740614400, // 2025-02-27
            end_timestamp: None,
            chain: "osmosis",
            lcd: "https://lcd.osmosis.zone",
            vault: VaultConfig {
                holder_address: "osmo1q7uxrqvvl4wcjff6vpmq0gssn8h87ffsfmh0rg".to_string(),
                vault_address:
                    "osmo1jz6jfqeze8fpyhm9c9zdnjsyn0zgvg6fdw24vzjvrzj4l4mchs3qgzc0tn".to_string(),
                token0_denom: OSMOSIS_ATOM.to_string(),
                token1_denom: "uosmo".to_string(),
            },
            initial_balances: vec![
                (OSMOSIS_ATOM.to_string(), dec!(12500)),
                ("uosmo".to_string(), dec!(210000)),
            ],
        },
    )])
}
