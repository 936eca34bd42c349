//! Static per-model price table and cost calculation.
//!
//! Prices are USD per million tokens for four classes: input, output, cache
//! write, and cache read. Cache writes are billed above input and cache
//! reads far below it, per the context-caching pricing scheme.

use std::collections::HashMap;

use crate::models::{CostBreakdown, TokenUsage};


/// Per-model unit prices, USD per million tokens.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub input_price_per_mtok: f64,
    pub output_price_per_mtok: f64,
    pub cache_write_price_per_mtok: f64,
    pub cache_read_price_per_mtok: f64,
}

/// Row used when a model id matches nothing else (Sonnet-class rates).
pub const DEFAULT_PRICING: ModelPricing = ModelPricing {
    input_price_per_mtok: 3.0,
    output_price_per_mtok: 15.0,
    cache_write_price_per_mtok: 3.75,
    cache_read_price_per_mtok: 0.30,
};

const OPUS_PRICING: ModelPricing = ModelPricing {
    input_price_per_mtok: 15.0,
    output_price_per_mtok: 75.0,
    cache_write_price_per_mtok: 18.75,
    cache_read_price_per_mtok: 1.50,
};

const HAIKU_3_5_PRICING: ModelPricing = ModelPricing {
    input_price_per_mtok: 0.80,
    output_price_per_mtok: 4.0,
    cache_write_price_per_mtok: 1.0,
    cache_read_price_per_mtok: 0.08,
};

const HAIKU_3_PRICING: ModelPricing = ModelPricing {
    input_price_per_mtok: 0.25,
    output_price_per_mtok: 1.25,
    cache_write_price_per_mtok: 0.30,
    cache_read_price_per_mtok: 0.03,
};

/// Exact-match price rows.
const MODEL_PRICES: [(&str, ModelPricing); 7] = [
    ("claude-opus-4", OPUS_PRICING),
    ("claude-opus-3", OPUS_PRICING),
    ("claude-sonnet-4", DEFAULT_PRICING),
    ("claude-3-5-sonnet", DEFAULT_PRICING),
    ("claude-3-sonnet", DEFAULT_PRICING),
    ("claude-3-5-haiku", HAIKU_3_5_PRICING),
    ("claude-3-haiku", HAIKU_3_PRICING),
];


/// Resolve a model identifier to a price row: exact match first, then
/// family substring, then the default row.
pub fn resolve_pricing(model: &str) -> ModelPricing {
    for (name, pricing) in &MODEL_PRICES {
        if *name == model {
            return *pricing;
        }
    }

    let lowered = model.to_lowercase();
    if lowered.contains("opus") {
        OPUS_PRICING
    } else if lowered.contains("sonnet") {
        DEFAULT_PRICING
    } else if lowered.contains("haiku") {
        HAIKU_3_5_PRICING
    } else {
        DEFAULT_PRICING
    }
}


/// Cost of one usage bucket at the given rates.
pub fn model_cost(usage: &TokenUsage, pricing: &ModelPricing) -> f64 {
    let mtok = 1_000_000.0;
    usage.input_tokens as f64 * pricing.input_price_per_mtok / mtok
        + usage.output_tokens as f64 * pricing.output_price_per_mtok / mtok
        + usage.cache_creation_tokens as f64 * pricing.cache_write_price_per_mtok / mtok
        + usage.cache_read_tokens as f64 * pricing.cache_read_price_per_mtok / mtok
}


/// Build the full cost breakdown. When per-model usage is available the
/// total is the sum of per-model costs; otherwise the whole usage is priced
/// at default rates. The four class lines are always computed from the grand
/// total at default rates, so when multiple models are in play they need not
/// reconcile exactly with the per-model total.
pub fn calculate(
    total_usage: &TokenUsage,
    model_stats: &HashMap<String, TokenUsage>,
    is_estimated: bool,
) -> CostBreakdown {
    let mut breakdown = CostBreakdown {
        currency: "USD".to_string(),
        is_estimated,
        ..Default::default()
    };

    if model_stats.is_empty() {
        breakdown.total_cost = model_cost(total_usage, &DEFAULT_PRICING);
    } else {
        for (model, usage) in model_stats {
            let cost = model_cost(usage, &resolve_pricing(model));
            breakdown.model_costs.insert(model.clone(), cost);
            breakdown.total_cost += cost;
        }
    }

    let mtok = 1_000_000.0;
    breakdown.input_cost =
        total_usage.input_tokens as f64 * DEFAULT_PRICING.input_price_per_mtok / mtok;
    breakdown.output_cost =
        total_usage.output_tokens as f64 * DEFAULT_PRICING.output_price_per_mtok / mtok;
    breakdown.cache_creation_cost =
        total_usage.cache_creation_tokens as f64 * DEFAULT_PRICING.cache_write_price_per_mtok / mtok;
    breakdown.cache_read_cost =
        total_usage.cache_read_tokens as f64 * DEFAULT_PRICING.cache_read_price_per_mtok / mtok;

    breakdown
}
