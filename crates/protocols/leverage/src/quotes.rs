//! Swap quotes for leverage flows
//!
//! Quotes come from the `ExchangeHelpers` contract, which prices BOLD against
//! a branch's collateral. Read failures propagate; only degenerate price
//! impact inputs are absorbed (impact `0.0`).

use bold_core::{BranchId, ProtocolContract, ProtocolError, Result, U256};
use evm_client::{ChainClient, ContractCall};
use serde::{Deserialize, Serialize};

use crate::calculator::{apply_slippage, to_fixed, u256_to_f64};
use crate::constants::{params, DECIMAL_PRECISION};

/// Swap direction between a branch's collateral and BOLD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapDirection {
    CollToBold,
    BoldToColl,
}

impl SwapDirection {
    /// The `collToBold` flag passed to the quoting contract
    pub fn coll_to_bold(&self) -> bool {
        matches!(self, Self::CollToBold)
    }
}

/// Parameters for opening a leveraged position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeverageParams {
    /// Collateral borrowed through the flash loan
    pub flash_loan_amount: U256,
    /// BOLD borrowed to buy the flash-loaned collateral (slippage included)
    pub bold_amount: U256,
    pub total_deposit: U256,
    pub price_impact: f64,
}

/// Parameters for reducing leverage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleverageParams {
    /// Collateral sold through the flash loan
    pub flash_loan_amount: U256,
    /// Least BOLD accepted for the sold collateral (slippage included)
    pub min_bold_amount: U256,
    pub price_impact: f64,
}

/// Quote reader bound to one chain client
#[derive(Debug, Clone)]
pub struct QuoteService {
    client: ChainClient,
    slippage_tolerance: f64,
}

impl QuoteService {
    /// Uses the slippage tolerance from the client's settings
    pub fn new(client: ChainClient) -> Self {
        let slippage_tolerance = client.settings().slippage_tolerance;
        Self {
            client,
            slippage_tolerance,
        }
    }

    pub fn with_slippage(mut self, tolerance: f64) -> Self {
        self.slippage_tolerance = tolerance;
        self
    }

    pub fn slippage_tolerance(&self) -> f64 {
        self.slippage_tolerance
    }

    fn quote_call(
        &self,
        function: &'static str,
        amount: U256,
        direction: SwapDirection,
        branch: BranchId,
    ) -> ContractCall {
        let registry = self.client.registry();
        ContractCall::new(
            registry.protocol_contract(ProtocolContract::ExchangeHelpers),
            function,
        )
        .arg(amount)
        .arg(direction.coll_to_bold())
        .arg(registry.coll_token(branch).address)
    }

    /// Output received for selling exactly `amount_in`
    pub async fn quote_exact_input(
        &self,
        amount_in: U256,
        direction: SwapDirection,
        branch: BranchId,
    ) -> Result<U256> {
        let call = self.quote_call("quoteExactInput", amount_in, direction, branch);
        let amount_out = self.client.read(&call).await?.expect_uint(call.function)?;
        tracing::debug!(
            branch = %branch,
            direction = ?direction,
            amount_in = %amount_in,
            amount_out = %amount_out,
            "Quoted exact input"
        );
        Ok(amount_out)
    }

    /// Input needed to receive exactly `amount_out`
    pub async fn quote_exact_output(
        &self,
        amount_out: U256,
        direction: SwapDirection,
        branch: BranchId,
    ) -> Result<U256> {
        let call = self.quote_call("quoteExactOutput", amount_out, direction, branch);
        let amount_in = self.client.read(&call).await?.expect_uint(call.function)?;
        tracing::debug!(
            branch = %branch,
            direction = ?direction,
            amount_in = %amount_in,
            amount_out = %amount_out,
            "Quoted exact output"
        );
        Ok(amount_in)
    }

    /// Price impact of selling `amount_in`, as a fraction (0.01 = 1%).
    ///
    /// Compares the rate for the full amount with the rate for 1/1000 of it.
    /// Returns 0.0 when the marginal amount rounds to zero or either rate is zero.
    pub async fn price_impact(
        &self,
        amount_in: U256,
        direction: SwapDirection,
        branch: BranchId,
    ) -> Result<f64> {
        let amount_out = self.quote_exact_input(amount_in, direction, branch).await?;

        let marginal_in = amount_in / U256::from(params::MARGINAL_AMOUNT_DIVISOR);
        if marginal_in.is_zero() {
            return Ok(0.0);
        }
        let marginal_out = self.quote_exact_input(marginal_in, direction, branch).await?;

        let bulk_rate = rate(amount_out, amount_in);
        let marginal_rate = rate(marginal_out, marginal_in);
        if marginal_rate == 0.0 {
            return Ok(0.0);
        }
        Ok((marginal_rate - bulk_rate) / marginal_rate)
    }

    /// BOLD to spend for exactly `coll_amount` collateral; buffered upwards for slippage
    pub async fn bold_needed_for_collateral(
        &self,
        coll_amount: U256,
        branch: BranchId,
        with_slippage: bool,
    ) -> Result<U256> {
        let bold = self
            .quote_exact_output(coll_amount, SwapDirection::BoldToColl, branch)
            .await?;
        Ok(if with_slippage {
            apply_slippage(bold, self.slippage_tolerance, true)
        } else {
            bold
        })
    }

    /// BOLD received for selling `coll_amount` collateral; buffered downwards for slippage
    pub async fn bold_received_for_collateral(
        &self,
        coll_amount: U256,
        branch: BranchId,
        with_slippage: bool,
    ) -> Result<U256> {
        let bold = self
            .quote_exact_input(coll_amount, SwapDirection::CollToBold, branch)
            .await?;
        Ok(if with_slippage {
            apply_slippage(bold, self.slippage_tolerance, false)
        } else {
            bold
        })
    }

    /// Size a leveraged open from the user's deposit and target factor
    pub async fn leverage_params(
        &self,
        initial_deposit: U256,
        factor: f64,
        branch: BranchId,
    ) -> Result<LeverageParams> {
        if factor.is_nan() || factor <= 1.0 {
            return Err(ProtocolError::InvalidAmount {
                message: format!("leverage factor must exceed 1, got {}", factor),
            }
            .into());
        }

        let total_deposit = initial_deposit * to_fixed(factor) / DECIMAL_PRECISION;
        let flash_loan_amount = total_deposit.saturating_sub(initial_deposit);
        let bold_amount = self
            .bold_needed_for_collateral(flash_loan_amount, branch, true)
            .await?;
        let price_impact = self
            .price_impact(bold_amount, SwapDirection::BoldToColl, branch)
            .await?;

        Ok(LeverageParams {
            flash_loan_amount,
            bold_amount,
            total_deposit,
            price_impact,
        })
    }

    /// Size a deleverage selling `coll_to_sell` collateral
    pub async fn deleverage_params(
        &self,
        coll_to_sell: U256,
        branch: BranchId,
    ) -> Result<DeleverageParams> {
        let min_bold_amount = self
            .bold_received_for_collateral(coll_to_sell, branch, true)
            .await?;
        let price_impact = self
            .price_impact(coll_to_sell, SwapDirection::CollToBold, branch)
            .await?;

        Ok(DeleverageParams {
            flash_loan_amount: coll_to_sell,
            min_bold_amount,
            price_impact,
        })
    }
}

fn rate(out: U256, input: U256) -> f64 {
    let rate = u256_to_f64(out) / u256_to_f64(input);
    if rate.is_finite() {
        rate
    } else {
        0.0
    }
}
