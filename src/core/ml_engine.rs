//! Lead intelligence models: scoring, churn risk, segmentation and
//! recommendations over a snapshot of active leads.
//!
//! Every model is a pure function of `(leads, now)`, so one engine instance
//! is shared by all requests for the lifetime of the process.

use crate::domain::model::{
    ActionPriority, Lead, MlAnalysis, MlSummary, Priority, Recommendation, RiskLevel, ScoredLead,
    Segment,
};
use crate::utils::error::{Result, ServiceError};
use crate::utils::validation::{validate_positive_number, validate_range};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound for `/api/v1/top-leads/{limit}`.
pub const MAX_TOP_LEADS: usize = 100;

// Logistic scoring model coefficients
const SCORE_INTERCEPT: f64 = -4.0;
const W_ENGAGEMENT: f64 = 2.2;
const W_RECENCY: f64 = 2.0;
const W_VALUE: f64 = 1.5;
const W_SOURCE: f64 = 1.0;
const W_STAGE: f64 = 2.5;
const W_CONTACT: f64 = 0.8;

// Churn model coefficients
const CHURN_INTERCEPT: f64 = -3.0;
const CHURN_PER_INACTIVE_DAY: f64 = 0.08;
const CHURN_ENGAGEMENT: f64 = -2.0;
const CHURN_STAGE: f64 = -1.5;

const ENGAGEMENT_CAP: i32 = 20;
const RECENCY_DECAY_DAYS: f64 = 30.0;
const VALUE_CEILING: f64 = 100_000.0;
const UNKNOWN_WEIGHT: f64 = 0.3;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[A-Za-z]{2,}$";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlConfig {
    pub hot_threshold: u8,
    pub warm_threshold: u8,
    pub churn_high: f64,
    pub churn_medium: f64,
    pub high_value_threshold: f64,
    pub max_recommendations: usize,
}

impl Default for MlConfig {
    fn default() -> Self {
        Self {
            hot_threshold: 75,
            warm_threshold: 50,
            churn_high: 0.7,
            churn_medium: 0.4,
            high_value_threshold: 10_000.0,
            max_recommendations: 50,
        }
    }
}

impl MlConfig {
    fn check(&self) -> Result<()> {
        validate_range("ml.hot_threshold", self.hot_threshold, 1, 100)?;
        validate_range("ml.warm_threshold", self.warm_threshold, 1, 100)?;
        if self.warm_threshold >= self.hot_threshold {
            return Err(ServiceError::ConfigValidationError {
                field: "ml.warm_threshold".to_string(),
                message: format!(
                    "warm threshold {} must be below hot threshold {}",
                    self.warm_threshold, self.hot_threshold
                ),
            });
        }

        validate_range("ml.churn_high", self.churn_high, 0.0, 1.0)?;
        validate_range("ml.churn_medium", self.churn_medium, 0.0, 1.0)?;
        if !(self.churn_medium > 0.0 && self.churn_medium < self.churn_high && self.churn_high < 1.0)
        {
            return Err(ServiceError::ConfigValidationError {
                field: "ml.churn_medium".to_string(),
                message: format!(
                    "expected 0 < churn_medium ({}) < churn_high ({}) < 1",
                    self.churn_medium, self.churn_high
                ),
            });
        }

        if !self.high_value_threshold.is_finite() || self.high_value_threshold < 0.0 {
            return Err(ServiceError::ConfigValidationError {
                field: "ml.high_value_threshold".to_string(),
                message: "must be a non-negative number".to_string(),
            });
        }

        validate_positive_number("ml.max_recommendations", self.max_recommendations, 1)
    }
}

/// Normalised model inputs, each in `[0, 1]`.
#[derive(Debug, Clone, Copy)]
struct LeadFeatures {
    engagement: f64,
    recency: f64,
    value: f64,
    source: f64,
    stage: f64,
    contact: f64,
    days_inactive: i64,
    has_valid_email: bool,
}

pub struct MlEngine {
    config: MlConfig,
    email_pattern: Regex,
}

impl MlEngine {
    pub fn new(config: MlConfig) -> Result<Self> {
        config.check().map_err(|e| ServiceError::EngineInitError {
            engine: "ml".to_string(),
            message: e.to_string(),
        })?;

        let email_pattern = Regex::new(EMAIL_PATTERN).map_err(|e| ServiceError::EngineInitError {
            engine: "ml".to_string(),
            message: format!("e-mail pattern: {}", e),
        })?;

        tracing::info!(
            "🧠 ML engine loaded (hot ≥ {}, warm ≥ {}, churn high ≥ {:.2})",
            config.hot_threshold,
            config.warm_threshold,
            config.churn_high
        );

        Ok(Self {
            config,
            email_pattern,
        })
    }

    pub fn is_valid_email(&self, email: Option<&str>) -> bool {
        email
            .map(str::trim)
            .is_some_and(|e| self.email_pattern.is_match(e))
    }

    fn features(&self, lead: &Lead, now: DateTime<Utc>) -> LeadFeatures {
        let days_inactive = lead.days_inactive(now);
        let has_valid_email = self.is_valid_email(lead.email.as_deref());
        let has_company = lead
            .company
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());

        let deal = lead.deal_value.max(0.0);
        let value = ((1.0 + deal).ln() / (1.0 + VALUE_CEILING).ln()).min(1.0);

        LeadFeatures {
            engagement: f64::from(lead.interactions.clamp(0, ENGAGEMENT_CAP))
                / f64::from(ENGAGEMENT_CAP),
            recency: (-(days_inactive as f64) / RECENCY_DECAY_DAYS).exp(),
            value,
            source: source_weight(lead.source.as_deref()),
            stage: stage_weight(lead.status.as_deref()),
            contact: if has_valid_email { 0.7 } else { 0.0 } + if has_company { 0.3 } else { 0.0 },
            days_inactive,
            has_valid_email,
        }
    }

    fn score_from(features: &LeadFeatures) -> u8 {
        let z = SCORE_INTERCEPT
            + W_ENGAGEMENT * features.engagement
            + W_RECENCY * features.recency
            + W_VALUE * features.value
            + W_SOURCE * features.source
            + W_STAGE * features.stage
            + W_CONTACT * features.contact;

        (sigmoid(z) * 100.0).round().clamp(0.0, 100.0) as u8
    }

    fn churn_from(lead: &Lead, features: &LeadFeatures) -> f64 {
        if lead.converted {
            return 0.0;
        }
        sigmoid(
            CHURN_INTERCEPT
                + CHURN_PER_INACTIVE_DAY * features.days_inactive as f64
                + CHURN_ENGAGEMENT * features.engagement
                + CHURN_STAGE * features.stage,
        )
    }

    /// Lead score in `0..=100`.
    pub fn score_lead(&self, lead: &Lead, now: DateTime<Utc>) -> u8 {
        Self::score_from(&self.features(lead, now))
    }

    /// Probability in `[0, 1]` that the lead goes cold; 0 for converted leads.
    pub fn churn_probability(&self, lead: &Lead, now: DateTime<Utc>) -> f64 {
        Self::churn_from(lead, &self.features(lead, now))
    }

    pub fn priority_for(&self, score: u8) -> Priority {
        if score >= self.config.hot_threshold {
            Priority::Hot
        } else if score >= self.config.warm_threshold {
            Priority::Warm
        } else {
            Priority::Cold
        }
    }

    pub fn risk_for(&self, churn_probability: f64) -> RiskLevel {
        if churn_probability >= self.config.churn_high {
            RiskLevel::High
        } else if churn_probability >= self.config.churn_medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    fn segment_for(&self, lead: &Lead, score: u8, risk: RiskLevel) -> Segment {
        if lead.converted {
            Segment::Customers
        } else if risk == RiskLevel::High {
            Segment::AtRisk
        } else if score >= self.config.hot_threshold
            && lead.deal_value >= self.config.high_value_threshold
        {
            Segment::Champions
        } else if score >= self.config.warm_threshold {
            Segment::Promising
        } else {
            Segment::NeedsNurturing
        }
    }

    pub fn evaluate(&self, lead: &Lead, now: DateTime<Utc>) -> ScoredLead {
        let features = self.features(lead, now);
        let score = Self::score_from(&features);
        let churn_probability = Self::churn_from(lead, &features);
        let churn_risk = self.risk_for(churn_probability);

        ScoredLead {
            lead_id: lead.id,
            name: lead.name.clone(),
            company: lead.company.clone(),
            country: lead.country.clone(),
            score,
            priority: self.priority_for(score),
            churn_probability: round_to(churn_probability, 4),
            churn_risk,
            segment: self.segment_for(lead, score, churn_risk),
            deal_value: lead.deal_value,
            days_inactive: features.days_inactive,
            converted: lead.converted,
        }
    }

    fn recommend(&self, lead: &Lead, scored: &ScoredLead) -> Option<Recommendation> {
        if lead.converted {
            return None;
        }

        let (action, reason, priority) = if scored.churn_risk == RiskLevel::High {
            (
                "Re-engage with personalised outreach",
                format!(
                    "No activity for {} days; churn probability {:.0}%",
                    scored.days_inactive,
                    scored.churn_probability * 100.0
                ),
                ActionPriority::High,
            )
        } else if scored.priority == Priority::Hot {
            (
                "Schedule a closing call",
                format!(
                    "Lead score {} with {:.2} in pipeline value",
                    scored.score, scored.deal_value
                ),
                ActionPriority::High,
            )
        } else if scored.priority == Priority::Warm {
            (
                "Send a tailored proposal",
                format!("Lead score {} shows solid interest", scored.score),
                ActionPriority::Medium,
            )
        } else if !self.is_valid_email(lead.email.as_deref()) {
            (
                "Enrich contact details",
                "No valid e-mail address on file".to_string(),
                ActionPriority::Low,
            )
        } else {
            (
                "Add to nurture campaign",
                format!(
                    "Lead score {} is below the warm threshold of {}",
                    scored.score, self.config.warm_threshold
                ),
                ActionPriority::Low,
            )
        };

        Some(Recommendation {
            lead_id: lead.id,
            lead_name: lead.name.clone(),
            action: action.to_string(),
            reason,
            priority,
        })
    }

    /// One action per open lead, most urgent first.
    pub fn recommendations(&self, leads: &[Lead], scored: &[ScoredLead]) -> Vec<Recommendation> {
        let mut ranked: Vec<(u8, Recommendation)> = leads
            .iter()
            .zip(scored)
            .filter_map(|(lead, s)| self.recommend(lead, s).map(|r| (s.score, r)))
            .collect();

        ranked.sort_by(|(score_a, a), (score_b, b)| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| score_b.cmp(score_a))
                .then_with(|| a.lead_id.cmp(&b.lead_id))
        });

        ranked
            .into_iter()
            .take(self.config.max_recommendations)
            .map(|(_, r)| r)
            .collect()
    }

    pub fn summarize(&self, scored: &[ScoredLead]) -> MlSummary {
        let mut priority_distribution: BTreeMap<String, usize> = [Priority::Hot, Priority::Warm, Priority::Cold]
            .iter()
            .map(|p| (format!("{:?}", p), 0))
            .collect();
        let mut segment_distribution: BTreeMap<String, usize> = [
            Segment::Customers,
            Segment::AtRisk,
            Segment::Champions,
            Segment::Promising,
            Segment::NeedsNurturing,
        ]
        .iter()
        .map(|s| (s.label().to_string(), 0))
        .collect();

        for lead in scored {
            *priority_distribution
                .entry(format!("{:?}", lead.priority))
                .or_insert(0) += 1;
            *segment_distribution
                .entry(lead.segment.label().to_string())
                .or_insert(0) += 1;
        }

        let total = scored.len();
        let (average_score, conversion_rate) = if total == 0 {
            (0.0, 0.0)
        } else {
            let score_sum: f64 = scored.iter().map(|s| f64::from(s.score)).sum();
            let converted = scored.iter().filter(|s| s.converted).count();
            (
                round_to(score_sum / total as f64, 1),
                round_to(converted as f64 / total as f64 * 100.0, 1),
            )
        };

        MlSummary {
            total_leads: total,
            average_score,
            priority_distribution,
            segment_distribution,
            at_risk_count: scored
                .iter()
                .filter(|s| s.churn_risk == RiskLevel::High)
                .count(),
            conversion_rate,
            total_pipeline_value: round_to(
                scored
                    .iter()
                    .filter(|s| !s.converted)
                    .map(|s| s.deal_value.max(0.0))
                    .sum(),
                2,
            ),
        }
    }

    /// 執行全部四個模型
    pub fn run_all_models(&self, leads: &[Lead], now: DateTime<Utc>) -> MlAnalysis {
        let scored_leads: Vec<ScoredLead> = leads.iter().map(|l| self.evaluate(l, now)).collect();

        let mut top_leads: Vec<ScoredLead> = scored_leads
            .iter()
            .filter(|s| !s.converted)
            .cloned()
            .collect();
        top_leads.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.lead_id.cmp(&b.lead_id)));
        top_leads.truncate(MAX_TOP_LEADS);

        let mut at_risk_leads: Vec<ScoredLead> = scored_leads
            .iter()
            .filter(|s| s.churn_risk == RiskLevel::High)
            .cloned()
            .collect();
        at_risk_leads.sort_by(|a, b| {
            b.churn_probability
                .total_cmp(&a.churn_probability)
                .then_with(|| a.lead_id.cmp(&b.lead_id))
        });

        let recommendations = self.recommendations(leads, &scored_leads);
        let summary = self.summarize(&scored_leads);

        tracing::debug!(
            "ML models scored {} leads ({} at risk, {} recommendations)",
            summary.total_leads,
            summary.at_risk_count,
            recommendations.len()
        );

        MlAnalysis {
            status: "success".to_string(),
            timestamp: now,
            summary,
            scored_leads,
            top_leads,
            at_risk_leads,
            recommendations,
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn normalize_label(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_ascii_lowercase().replace([' ', '-'], "_"))
        .filter(|v| !v.is_empty())
}

fn source_weight(source: Option<&str>) -> f64 {
    match normalize_label(source).as_deref() {
        Some("referral" | "partner") => 1.0,
        Some("event" | "trade_show" | "webinar") => 0.8,
        Some("website" | "web" | "inbound" | "organic") => 0.6,
        Some("social" | "social_media" | "linkedin") => 0.4,
        Some("cold_call" | "outbound" | "purchased_list") => 0.2,
        _ => UNKNOWN_WEIGHT,
    }
}

fn stage_weight(status: Option<&str>) -> f64 {
    match normalize_label(status).as_deref() {
        Some("new") => 0.2,
        Some("contacted") => 0.4,
        Some("qualified") => 0.7,
        Some("proposal") => 0.9,
        Some("negotiation" | "won") => 1.0,
        Some("lost") => 0.0,
        _ => UNKNOWN_WEIGHT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn base_lead(id: i64) -> Lead {
        Lead {
            id,
            name: format!("Lead {}", id),
            email: None,
            company: None,
            country: Some("Germany".to_string()),
            source: None,
            status: None,
            deal_value: 0.0,
            interactions: 0,
            created_at: now() - Duration::days(120),
            last_activity_at: Some(now()),
            converted: false,
        }
    }

    fn hot_lead(id: i64) -> Lead {
        Lead {
            email: Some("buyer@acme.io".to_string()),
            company: Some("Acme".to_string()),
            source: Some("Referral".to_string()),
            status: Some("negotiation".to_string()),
            deal_value: 100_000.0,
            interactions: 25,
            ..base_lead(id)
        }
    }

    fn warm_lead(id: i64) -> Lead {
        Lead {
            email: Some("info@example.com".to_string()),
            source: Some("website".to_string()),
            status: Some("contacted".to_string()),
            deal_value: 2_000.0,
            interactions: 4,
            last_activity_at: Some(now() - Duration::days(20)),
            ..base_lead(id)
        }
    }

    fn stale_lead(id: i64) -> Lead {
        Lead {
            source: Some("cold call".to_string()),
            status: Some("new".to_string()),
            last_activity_at: Some(now() - Duration::days(90)),
            ..base_lead(id)
        }
    }

    fn engine() -> MlEngine {
        MlEngine::new(MlConfig::default()).unwrap()
    }

    #[test]
    fn test_hot_lead_scores_near_top() {
        let engine = engine();
        let scored = engine.evaluate(&hot_lead(1), now());

        assert_eq!(scored.score, 100);
        assert_eq!(scored.priority, Priority::Hot);
        assert_eq!(scored.churn_risk, RiskLevel::Low);
        assert_eq!(scored.segment, Segment::Champions);
    }

    #[test]
    fn test_warm_lead_is_promising() {
        let engine = engine();
        let scored = engine.evaluate(&warm_lead(2), now());

        assert!((50..75).contains(&scored.score), "score was {}", scored.score);
        assert_eq!(scored.priority, Priority::Warm);
        assert_eq!(scored.segment, Segment::Promising);
    }

    #[test]
    fn test_stale_lead_is_at_risk() {
        let engine = engine();
        let lead = stale_lead(3);
        let scored = engine.evaluate(&lead, now());

        assert!(scored.score <= 10, "score was {}", scored.score);
        assert_eq!(scored.priority, Priority::Cold);
        assert_eq!(scored.days_inactive, 90);
        assert!(scored.churn_probability > 0.9);
        assert_eq!(scored.churn_risk, RiskLevel::High);
        assert_eq!(scored.segment, Segment::AtRisk);
    }

    #[test]
    fn test_converted_lead_has_no_churn_and_no_action() {
        let engine = engine();
        let lead = Lead {
            converted: true,
            status: Some("won".to_string()),
            last_activity_at: Some(now() - Duration::days(200)),
            ..base_lead(4)
        };

        assert_eq!(engine.churn_probability(&lead, now()), 0.0);
        let scored = engine.evaluate(&lead, now());
        assert_eq!(scored.segment, Segment::Customers);
        assert!(engine.recommendations(&[lead], &[scored]).is_empty());
    }

    #[test]
    fn test_scores_stay_in_range_for_extreme_input() {
        let engine = engine();
        let lead = Lead {
            deal_value: -50.0,
            interactions: -3,
            last_activity_at: Some(now() + Duration::days(10)),
            ..base_lead(5)
        };
        let score = engine.score_lead(&lead, now());
        assert!(score <= 100);
        let churn = engine.churn_probability(&lead, now());
        assert!((0.0..=1.0).contains(&churn));
    }

    #[test]
    fn test_email_validation() {
        let engine = engine();
        assert!(engine.is_valid_email(Some("a.b@example.co")));
        assert!(engine.is_valid_email(Some("  sales@acme.io ")));
        assert!(!engine.is_valid_email(Some("not-an-email")));
        assert!(!engine.is_valid_email(Some("a@b")));
        assert!(!engine.is_valid_email(None));
    }

    #[test]
    fn test_recommendations_are_ordered_by_urgency() {
        let engine = engine();
        let leads = vec![warm_lead(10), stale_lead(11), hot_lead(12), base_lead(13)];
        let scored: Vec<ScoredLead> = leads.iter().map(|l| engine.evaluate(l, now())).collect();

        let recs = engine.recommendations(&leads, &scored);
        assert_eq!(recs.len(), 4);

        // 高優先級中分數較高者在前
        assert_eq!(recs[0].lead_id, 12);
        assert_eq!(recs[0].action, "Schedule a closing call");
        assert_eq!(recs[1].lead_id, 11);
        assert_eq!(recs[1].action, "Re-engage with personalised outreach");
        assert_eq!(recs[2].priority, ActionPriority::Medium);
        assert_eq!(recs[3].priority, ActionPriority::Low);
        assert_eq!(recs[3].action, "Enrich contact details");
    }

    #[test]
    fn test_recommendations_respect_limit() {
        let engine = MlEngine::new(MlConfig {
            max_recommendations: 2,
            ..MlConfig::default()
        })
        .unwrap();
        let leads: Vec<Lead> = (1..=5).map(stale_lead).collect();
        let scored: Vec<ScoredLead> = leads.iter().map(|l| engine.evaluate(l, now())).collect();

        let recs = engine.recommendations(&leads, &scored);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].lead_id, 1);
        assert_eq!(recs[1].lead_id, 2);
    }

    #[test]
    fn test_run_all_models() {
        let engine = engine();
        let mut customer = warm_lead(5);
        customer.converted = true;
        let leads = vec![stale_lead(1), warm_lead(2), hot_lead(3), hot_lead(4), customer];

        let analysis = engine.run_all_models(&leads, now());

        assert_eq!(analysis.status, "success");
        assert_eq!(analysis.timestamp, now());
        assert_eq!(analysis.scored_leads.len(), 5);
        assert_eq!(analysis.summary.total_leads, 5);
        assert_eq!(analysis.summary.at_risk_count, 1);
        assert_eq!(analysis.summary.conversion_rate, 20.0);
        assert_eq!(analysis.summary.priority_distribution["Hot"], 2);
        assert_eq!(analysis.summary.segment_distribution["Customers"], 1);
        assert_eq!(analysis.summary.segment_distribution["At Risk"], 1);
        assert_eq!(analysis.summary.total_pipeline_value, 202_000.0);

        // 已成交的客戶不出現在 top leads
        assert_eq!(analysis.top_leads.len(), 4);
        assert_eq!(analysis.top_leads[0].lead_id, 3);
        assert_eq!(analysis.top_leads[1].lead_id, 4);
        assert!(analysis
            .top_leads
            .windows(2)
            .all(|w| w[0].score >= w[1].score));

        assert_eq!(analysis.at_risk_leads.len(), 1);
        assert_eq!(analysis.at_risk_leads[0].lead_id, 1);
        assert_eq!(analysis.recommendations.len(), 4);
    }

    #[test]
    fn test_run_all_models_on_empty_input() {
        let analysis = engine().run_all_models(&[], now());

        assert_eq!(analysis.summary.total_leads, 0);
        assert_eq!(analysis.summary.average_score, 0.0);
        assert_eq!(analysis.summary.priority_distribution["Cold"], 0);
        assert!(analysis.top_leads.is_empty());
        assert!(analysis.recommendations.is_empty());
    }

    #[test]
    fn test_invalid_thresholds_fail_engine_init() {
        let result = MlEngine::new(MlConfig {
            hot_threshold: 50,
            warm_threshold: 60,
            ..MlConfig::default()
        });
        assert!(matches!(result, Err(ServiceError::EngineInitError { .. })));

        let result = MlEngine::new(MlConfig {
            churn_medium: 0.8,
            churn_high: 0.7,
            ..MlConfig::default()
        });
        assert!(matches!(result, Err(ServiceError::EngineInitError { .. })));

        let result = MlEngine::new(MlConfig {
            max_recommendations: 0,
            ..MlConfig::default()
        });
        assert!(result.is_err());
    }
}
