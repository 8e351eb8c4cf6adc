//! Mars credit-account lending
//!
//! The deposited denom is lent through a credit account on the credit
//! manager contract. TVL is the params contract's pool-wide
//! `total_deposit`; principal is the credit account's lend entry for the
//! configured denom. The protocol does not track principal and yield
//! separately, so rewards are an explicit empty holdings.

use serde::Deserialize;
use serde_json::json;

use vantage_core::{Holdings, ValuationError, ValuationResult};

use super::{parse_raw, value_single_coin, ValuationContext};
use crate::query::Coin;

const CREDIT_MANAGER_CONTRACT: &str =
    "neutron1qdzn3l4kn7gsjna2tfpg3g3mwd6kunx4p50lfya59k02846xas6qslgs3r";
const PARAMS_CONTRACT: &str =
    "neutron1x4rgd7ry23v2n49y7xdzje0743c5tgrnqrqsvwyya2h6m48tz4jqqex06x";

#[derive(Debug, Deserialize)]
struct TotalDepositResponse {
    amount: String,
}

#[derive(Debug, Deserialize)]
struct PositionsResponse {
    #[serde(default)]
    lends: Vec<Coin>,
}

pub struct MarsPosition {
    credit_account_id: String,
    deposited_denom: String,
}

impl MarsPosition {
    pub fn new(credit_account_id: String, deposited_denom: String) -> Self {
        Self {
            credit_account_id,
            deposited_denom,
        }
    }

    pub async fn venue_tvl(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        let response: TotalDepositResponse = ctx
            .chain
            .smart_query(
                ctx.lcd,
                PARAMS_CONTRACT,
                &json!({"total_deposit": {"denom": self.deposited_denom}}),
            )
            .await?;

        let amount = parse_raw(&response.amount, "pool total deposit")?;
        value_single_coin(ctx.prices, ctx.catalog, &self.deposited_denom, amount).await
    }

    pub async fn address_principal(&self, ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        let response: PositionsResponse = ctx
            .chain
            .smart_query(
                ctx.lcd,
                CREDIT_MANAGER_CONTRACT,
                &json!({"positions": {"account_id": self.credit_account_id}}),
            )
            .await?;

        let amount = find_lend_amount(&response.lends, &self.deposited_denom)?.ok_or_else(|| {
            ValuationError::PositionNotFound(format!(
                "no lend position for credit account {} and denom {}",
                self.credit_account_id, self.deposited_denom
            ))
        })?;

        value_single_coin(ctx.prices, ctx.catalog, &self.deposited_denom, amount).await
    }

    pub async fn address_rewards(&self, _ctx: &ValuationContext<'_>) -> ValuationResult<Holdings> {
        // yield accrues into the lend position itself
        Ok(Holdings::empty())
    }
}

fn find_lend_amount(lends: &[Coin], denom: &str) -> ValuationResult<Option<i128>> {
    lends
        .iter()
        .find(|coin| coin.denom == denom)
        .map(|coin| parse_raw(&coin.amount, "lend amount"))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin(denom: &str, amount: &str) -> Coin {
        Coin {
            denom: denom.to_string(),
            amount: amount.to_string(),
        }
    }

    #[test]
    fn lend_amount_matches_configured_denom() {
        let lends = vec![coin("untrn", "5"), coin("ibc/atom", "12345")];
        assert_eq!(find_lend_amount(&lends, "ibc/atom").unwrap(), Some(12345));
    }

    #[test]
    fn absent_lend_entry_is_none() {
        let lends = vec![coin("untrn", "5")];
        assert_eq!(find_lend_amount(&lends, "ibc/atom").unwrap(), None);
    }

    #[test]
    fn unparseable_lend_amount_is_an_error() {
        let lends = vec![coin("ibc/atom", "???")];
        assert!(find_lend_amount(&lends, "ibc/atom").is_err());
    }
}
