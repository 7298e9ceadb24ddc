use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Latest market readings. Every field may be missing from the server payload.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub eth_price: Option<f64>,
    #[serde(default)]
    pub eth_iv_deribit: Option<f64>,
    #[serde(default)]
    pub eth_iv_binance: Option<f64>,
    #[serde(default)]
    pub eth_rv_1d: Option<f64>,
    #[serde(default)]
    pub eth_rv_7d: Option<f64>,
    #[serde(default)]
    pub eth_rv_30d: Option<f64>,
    #[serde(default)]
    pub btc_rv_7d: Option<f64>,
    #[serde(default)]
    pub btc_rv_30d: Option<f64>,
    #[serde(default)]
    pub vix: Option<f64>,
    #[serde(default)]
    pub move_index: Option<f64>,
    #[serde(default)]
    pub calls_bought: Option<f64>,
    #[serde(default)]
    pub calls_sold: Option<f64>,
    #[serde(default)]
    pub puts_bought: Option<f64>,
    #[serde(default)]
    pub puts_sold: Option<f64>,
    #[serde(default)]
    pub net_put_bias: Option<f64>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    #[serde(default)]
    pub assessment: Option<Assessment>,
    #[serde(default)]
    pub current_metrics: Option<CurrentMetrics>,
    #[serde(default)]
    pub skew_analysis: Option<SkewAnalysis>,
    #[serde(default)]
    pub regime_analysis: Option<RegimeAnalysis>,
    #[serde(default)]
    pub forward_projections: Option<ForwardProjections>,
    #[serde(default)]
    pub cross_asset: Option<CrossAsset>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub trading_positions: Vec<TradingPosition>,
    #[serde(default)]
    pub ai_insights: Option<AiInsights>,
}

impl AnalysisResult {
    pub fn commentary_for(&self, position: &TradingPosition) -> Option<&str> {
        let position_type = position.position_type.as_deref()?;
        self.ai_insights
            .as_ref()?
            .position_commentary
            .get(position_type)
            .map(String::as_str)
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assessment {
    #[serde(default)]
    pub overall_assessment: Option<String>,
    #[serde(default)]
    pub vrp_assessment: Option<String>,
    #[serde(default)]
    pub regime: Option<String>,
    #[serde(default)]
    pub top_opportunity: Option<String>,
    #[serde(default)]
    pub risk_level: Option<String>,
    #[serde(default)]
    pub confidence: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrentMetrics {
    #[serde(default)]
    pub eth_iv: Option<f64>,
    #[serde(default)]
    pub eth_rv_30d: Option<f64>,
    #[serde(default)]
    pub vrp: Option<f64>,
    /// Fraction in `[0, 1]`.
    #[serde(default)]
    pub estimated_ivr: Option<f64>,
    /// Fraction in `[0, 1]`.
    #[serde(default)]
    pub iv_percentile: Option<f64>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkewAnalysis {
    #[serde(default)]
    pub put_call_skew: Option<f64>,
    #[serde(default)]
    pub atm_skew: Option<f64>,
    #[serde(default)]
    pub smile_curvature: Option<f64>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegimeAnalysis {
    #[serde(default)]
    pub crypto_regime: Option<String>,
    #[serde(default)]
    pub tradfi_regime: Option<String>,
    #[serde(default)]
    pub regime_divergence: Option<bool>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForwardProjections {
    #[serde(default)]
    pub mc_mean: Option<f64>,
    #[serde(default)]
    pub mc_std: Option<f64>,
    #[serde(default)]
    pub mc_median: Option<f64>,
    #[serde(default, rename = "mc_5th_percentile")]
    pub mc_p5: Option<f64>,
    #[serde(default, rename = "mc_95th_percentile")]
    pub mc_p95: Option<f64>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrossAsset {
    #[serde(default)]
    pub eth_btc_rv_ratio: Option<f64>,
    #[serde(default)]
    pub eth_vix_ratio: Option<f64>,
    #[serde(default)]
    pub vix_regime: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiInsights {
    #[serde(default)]
    pub executive_summary: Option<String>,
    #[serde(default)]
    pub market_analysis: Option<String>,
    #[serde(default)]
    pub risk_assessment: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub position_commentary: HashMap<String, String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradingPosition {
    #[serde(default)]
    pub position_type: Option<String>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub strikes: Option<String>,
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default)]
    pub net_credit_debit: Option<f64>,
    /// Fraction in `[0, 1]`.
    #[serde(default)]
    pub win_probability: Option<f64>,
    #[serde(default)]
    pub max_risk: Option<f64>,
    #[serde(default)]
    pub max_profit: Option<f64>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub entry_criteria_met: bool,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
