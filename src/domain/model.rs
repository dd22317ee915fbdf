use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// 一筆有效的潛在客戶 (lead)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Lead {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub company: Option<String>,
    pub country: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub deal_value: f64,
    pub interactions: i32,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub converted: bool,
}

impl Lead {
    /// 最後一次互動距今的天數，沒有互動紀錄時以建立時間計算
    pub fn days_inactive(&self, now: DateTime<Utc>) -> i64 {
        let last = self.last_activity_at.unwrap_or(self.created_at);
        (now - last).num_days().max(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum Priority {
    Hot,
    Warm,
    Cold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum Segment {
    Customers,
    #[serde(rename = "At Risk")]
    AtRisk,
    Champions,
    Promising,
    #[serde(rename = "Needs Nurturing")]
    NeedsNurturing,
}

impl Segment {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Customers => "Customers",
            Self::AtRisk => "At Risk",
            Self::Champions => "Champions",
            Self::Promising => "Promising",
            Self::NeedsNurturing => "Needs Nurturing",
        }
    }
}

/// Ordering is High < Medium < Low so that sorting ascending puts urgent items first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum ActionPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScoredLead {
    pub lead_id: i64,
    pub name: String,
    pub company: Option<String>,
    pub country: Option<String>,
    pub score: u8,
    pub priority: Priority,
    pub churn_probability: f64,
    pub churn_risk: RiskLevel,
    pub segment: Segment,
    pub deal_value: f64,
    pub days_inactive: i64,
    pub converted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Recommendation {
    pub lead_id: i64,
    pub lead_name: String,
    pub action: String,
    pub reason: String,
    pub priority: ActionPriority,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MlSummary {
    pub total_leads: usize,
    pub average_score: f64,
    pub priority_distribution: BTreeMap<String, usize>,
    pub segment_distribution: BTreeMap<String, usize>,
    pub at_risk_count: usize,
    pub conversion_rate: f64,
    pub total_pipeline_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MlAnalysis {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub summary: MlSummary,
    pub scored_leads: Vec<ScoredLead>,
    pub top_leads: Vec<ScoredLead>,
    pub at_risk_leads: Vec<ScoredLead>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CountryMetrics {
    pub country: String,
    pub region: String,
    pub lead_count: usize,
    pub converted_count: usize,
    pub conversion_rate: f64,
    pub total_pipeline_value: f64,
    pub average_deal_value: f64,
    pub share_of_leads: f64,
    pub performance_score: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CountryAnalysis {
    pub countries: Vec<CountryMetrics>,
    pub top_performers: Vec<String>,
    pub underperformers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RegionMetrics {
    pub region: String,
    pub countries: Vec<String>,
    pub lead_count: usize,
    pub converted_count: usize,
    pub conversion_rate: f64,
    pub total_pipeline_value: f64,
    pub share_of_leads: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ConcentrationLevel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarketConcentration {
    pub hhi: f64,
    pub top3_share: f64,
    pub countries_for_80_percent: usize,
    pub level: ConcentrationLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum MarketAction {
    Expand,
    Optimize,
    Maintain,
    Investigate,
    Diversify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MarketRecommendation {
    pub country: Option<String>,
    pub action: MarketAction,
    pub message: String,
    pub priority: ActionPriority,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoSummary {
    pub total_leads: usize,
    pub total_countries: usize,
    pub total_regions: usize,
    pub top_country: Option<String>,
    pub top_region: Option<String>,
    pub overall_conversion_rate: f64,
    pub hhi: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeoAnalysis {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub country_analysis: CountryAnalysis,
    pub regional_analysis: Vec<RegionMetrics>,
    pub market_concentration: MarketConcentration,
    pub recommendations: Vec<MarketRecommendation>,
    pub summary: GeoSummary,
}
