use crate::parking::vehicle::VehicleClass;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// How the discount is rounded when `subtotal * percent / 100` ends in exactly one half.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub enum RoundingMode {
    /// 4.5 -> 5, 3.5 -> 4
    #[default]
    HalfAwayFromZero,
    /// 4.5 -> 4, 3.5 -> 4
    HalfEven,
}

/// Tariff parameters. The per class base price is fixed in [`VehicleClass::base_price`], everything else
/// can be configured.
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeePolicy {
    /// Minutes covered by the base price.
    #[serde(default = "default_base_period")]
    pub base_period_minutes: u32,
    #[serde(default = "default_block_minutes")]
    pub block_minutes: NonZeroU32,
    #[serde(default = "default_block_price")]
    pub block_price: i64,
    #[serde(default = "default_discount_percent")]
    pub discount_percent: u32,
    #[serde(default)]
    pub rounding: RoundingMode,
    /// If set, a fee which would end up below zero is charged as zero.
    #[serde(default = "default_clamp_negative")]
    pub clamp_negative: bool,
}

fn default_base_period() -> u32 {
    120
}

fn default_block_minutes() -> NonZeroU32 {
    NonZeroU32::new(15).unwrap_or(NonZeroU32::MIN)
}

fn default_block_price() -> i64 {
    5
}

fn default_discount_percent() -> u32 {
    15
}

fn default_clamp_negative() -> bool {
    true
}

impl Default for FeePolicy {
    fn default() -> Self {
        FeePolicy {
            base_period_minutes: default_base_period(),
            block_minutes: default_block_minutes(),
            block_price: default_block_price(),
            discount_percent: default_discount_percent(),
            rounding: RoundingMode::default(),
            clamp_negative: default_clamp_negative(),
        }
    }
}

/// All intermediate values of a fee calculation.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub base: i64,
    pub overage_minutes: i64,
    pub blocks: i64,
    pub subtotal: i64,
    pub discount: i64,
    pub fee: i64,
}

/// Maps (vehicle class, parked minutes, discount card) to the amount charged at check out. Holds no state
/// apart from its policy and never fails.
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct FeeCalculator {
    policy: FeePolicy,
}

impl FeeCalculator {
    pub fn new(policy: FeePolicy) -> Self {
        FeeCalculator { policy }
    }

    pub fn policy(&self) -> &FeePolicy {
        &self.policy
    }

    pub fn compute_fee(&self, class: VehicleClass, parked_minutes: i64, has_discount: bool) -> i64 {
        self.breakdown(class, parked_minutes, has_discount).fee
    }

    pub fn breakdown(
        &self,
        class: VehicleClass,
        parked_minutes: i64,
        has_discount: bool,
    ) -> FeeBreakdown {
        let base = class.base_price();
        let overage_minutes = parked_minutes
            .saturating_sub(self.policy.base_period_minutes as i64)
            .max(0);
        // partial blocks are charged as full blocks
        let block = self.policy.block_minutes.get() as i64;
        let blocks = overage_minutes / block + i64::from(overage_minutes % block != 0);
        let subtotal = base.saturating_add(blocks.saturating_mul(self.policy.block_price));

        let discount = if has_discount {
            round_div(
                subtotal.saturating_mul(self.policy.discount_percent as i64),
                100,
                self.policy.rounding,
            )
        } else {
            0
        };

        let mut fee = subtotal.saturating_sub(discount);
        if self.policy.clamp_negative {
            fee = fee.max(0);
        }

        FeeBreakdown {
            base,
            overage_minutes,
            blocks,
            subtotal,
            discount,
            fee,
        }
    }
}

/// Integer division `n / d` rounded to the nearest integer. `d` must be positive.
fn round_div(n: i64, d: i64, mode: RoundingMode) -> i64 {
    let q = n / d;
    let twice_rem = 2 * (n % d).abs();
    let away = q + n.signum();
    if twice_rem < d {
        q
    } else if twice_rem > d {
        away
    } else {
        match mode {
            RoundingMode::HalfAwayFromZero => away,
            RoundingMode::HalfEven if q % 2 == 0 => q,
            RoundingMode::HalfEven => away,
        }
    }
}
