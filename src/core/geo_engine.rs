//! Geographical market analysis over the lead snapshot.

use crate::core::regions::{CountryDirectory, UNKNOWN_COUNTRY};
use crate::domain::model::{
    ActionPriority, ConcentrationLevel, CountryAnalysis, CountryMetrics, GeoAnalysis, GeoSummary,
    Lead, MarketAction, MarketConcentration, MarketRecommendation, RegionMetrics,
};
use crate::utils::error::{Result, ServiceError};
use crate::utils::validation::{validate_positive_number, validate_range};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const TOP_PERFORMERS: usize = 3;
const EXPANSION_CONVERSION_FACTOR: f64 = 1.2;
const OPTIMIZATION_CONVERSION_FACTOR: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoConfig {
    /// Countries with fewer leads only get an "Investigate" recommendation.
    pub min_sample_size: usize,
    /// Max share of leads (%) for a country to be an expansion candidate.
    pub expansion_share_ceiling: f64,
    /// Min share of leads (%) for a country to be an optimisation candidate.
    pub optimization_share_floor: f64,
    pub concentration_high: f64,
    pub concentration_moderate: f64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 5,
            expansion_share_ceiling: 10.0,
            optimization_share_floor: 15.0,
            concentration_high: 0.25,
            concentration_moderate: 0.15,
        }
    }
}

impl GeoConfig {
    fn check(&self) -> Result<()> {
        validate_positive_number("geo.min_sample_size", self.min_sample_size, 1)?;
        validate_range("geo.expansion_share_ceiling", self.expansion_share_ceiling, 0.0, 100.0)?;
        validate_range("geo.optimization_share_floor", self.optimization_share_floor, 0.0, 100.0)?;
        if self.expansion_share_ceiling <= 0.0 {
            return Err(ServiceError::ConfigValidationError {
                field: "geo.expansion_share_ceiling".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        validate_range("geo.concentration_high", self.concentration_high, 0.0, 1.0)?;
        if !(self.concentration_moderate > 0.0 && self.concentration_moderate < self.concentration_high)
        {
            return Err(ServiceError::ConfigValidationError {
                field: "geo.concentration_moderate".to_string(),
                message: format!(
                    "expected 0 < concentration_moderate ({}) < concentration_high ({})",
                    self.concentration_moderate, self.concentration_high
                ),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
struct Tally {
    leads: usize,
    converted: usize,
    value: f64,
}

impl Tally {
    fn add(&mut self, lead: &Lead) {
        self.leads += 1;
        if lead.converted {
            self.converted += 1;
        }
        self.value += lead.deal_value.max(0.0);
    }

    fn conversion_rate(&self) -> f64 {
        percentage(self.converted, self.leads)
    }

    fn average_value(&self) -> f64 {
        if self.leads == 0 {
            0.0
        } else {
            self.value / self.leads as f64
        }
    }
}

pub struct GeoEngine {
    config: GeoConfig,
    directory: CountryDirectory,
}

impl GeoEngine {
    pub fn new(config: GeoConfig) -> Result<Self> {
        config.check().map_err(|e| ServiceError::EngineInitError {
            engine: "geo".to_string(),
            message: e.to_string(),
        })?;

        let directory = CountryDirectory::load().map_err(|message| ServiceError::EngineInitError {
            engine: "geo".to_string(),
            message,
        })?;

        tracing::info!(
            "🌍 Geo engine loaded ({} mapped countries, min sample {})",
            directory.known_countries(),
            config.min_sample_size
        );

        Ok(Self { config, directory })
    }

    fn tally_by_country(&self, leads: &[Lead]) -> BTreeMap<String, Tally> {
        let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
        for lead in leads {
            let country = self.directory.normalize(lead.country.as_deref());
            tallies.entry(country).or_default().add(lead);
        }
        tallies
    }

    /// 各國表現指標，依 performance score 排名
    pub fn country_performance(&self, leads: &[Lead]) -> Vec<CountryMetrics> {
        let tallies = self.tally_by_country(leads);
        let total = leads.len();

        let max_conversion = tallies.values().map(Tally::conversion_rate).fold(0.0, f64::max);
        let max_average = tallies.values().map(Tally::average_value).fold(0.0, f64::max);
        let max_share = tallies
            .values()
            .map(|t| percentage(t.leads, total))
            .fold(0.0, f64::max);

        let mut metrics: Vec<CountryMetrics> = tallies
            .iter()
            .map(|(country, tally)| {
                let share = percentage(tally.leads, total);
                let score = 50.0 * ratio(tally.conversion_rate(), max_conversion)
                    + 30.0 * ratio(tally.average_value(), max_average)
                    + 20.0 * ratio(share, max_share);

                CountryMetrics {
                    country: country.clone(),
                    region: self.directory.region_of(country).to_string(),
                    lead_count: tally.leads,
                    converted_count: tally.converted,
                    conversion_rate: round_to(tally.conversion_rate(), 1),
                    total_pipeline_value: round_to(tally.value, 2),
                    average_deal_value: round_to(tally.average_value(), 2),
                    share_of_leads: round_to(share, 1),
                    performance_score: round_to(score, 1),
                    rank: 0,
                }
            })
            .collect();

        metrics.sort_by(|a, b| {
            b.performance_score
                .total_cmp(&a.performance_score)
                .then_with(|| b.lead_count.cmp(&a.lead_count))
                .then_with(|| a.country.cmp(&b.country))
        });
        for (index, m) in metrics.iter_mut().enumerate() {
            m.rank = index + 1;
        }
        metrics
    }

    fn country_analysis(&self, countries: Vec<CountryMetrics>, overall_conversion: f64) -> CountryAnalysis {
        let top_performers = countries
            .iter()
            .filter(|c| c.country != UNKNOWN_COUNTRY)
            .take(TOP_PERFORMERS)
            .map(|c| c.country.clone())
            .collect();

        let underperformers = countries
            .iter()
            .filter(|c| {
                c.country != UNKNOWN_COUNTRY
                    && c.lead_count >= self.config.min_sample_size
                    && c.conversion_rate < overall_conversion * 0.5
            })
            .map(|c| c.country.clone())
            .collect();

        CountryAnalysis {
            countries,
            top_performers,
            underperformers,
        }
    }

    pub fn regional_analysis(&self, leads: &[Lead]) -> Vec<RegionMetrics> {
        let mut tallies: BTreeMap<&'static str, (Tally, BTreeSet<String>)> = BTreeMap::new();
        for lead in leads {
            let country = self.directory.normalize(lead.country.as_deref());
            let entry = tallies
                .entry(self.directory.region_of(&country))
                .or_default();
            entry.0.add(lead);
            entry.1.insert(country);
        }

        let total = leads.len();
        let mut regions: Vec<RegionMetrics> = tallies
            .into_iter()
            .map(|(region, (tally, countries))| RegionMetrics {
                region: region.to_string(),
                countries: countries.into_iter().collect(),
                lead_count: tally.leads,
                converted_count: tally.converted,
                conversion_rate: round_to(tally.conversion_rate(), 1),
                total_pipeline_value: round_to(tally.value, 2),
                share_of_leads: round_to(percentage(tally.leads, total), 1),
            })
            .collect();

        regions.sort_by(|a, b| b.lead_count.cmp(&a.lead_count).then_with(|| a.region.cmp(&b.region)));
        regions
    }

    /// Herfindahl–Hirschman index over per-country lead shares.
    pub fn market_concentration(&self, leads: &[Lead]) -> MarketConcentration {
        let total = leads.len();
        let mut counts: Vec<usize> = self
            .tally_by_country(leads)
            .values()
            .map(|t| t.leads)
            .collect();
        counts.sort_unstable_by(|a, b| b.cmp(a));

        if total == 0 {
            return MarketConcentration {
                hhi: 0.0,
                top3_share: 0.0,
                countries_for_80_percent: 0,
                level: ConcentrationLevel::Low,
            };
        }

        let hhi: f64 = counts
            .iter()
            .map(|&c| {
                let share = c as f64 / total as f64;
                share * share
            })
            .sum();

        let top3: usize = counts.iter().take(3).sum();

        let mut cumulative = 0;
        let mut countries_for_80_percent = 0;
        for count in &counts {
            cumulative += count;
            countries_for_80_percent += 1;
            if cumulative * 5 >= total * 4 {
                break;
            }
        }

        let level = if hhi > self.config.concentration_high {
            ConcentrationLevel::High
        } else if hhi >= self.config.concentration_moderate {
            ConcentrationLevel::Moderate
        } else {
            ConcentrationLevel::Low
        };

        MarketConcentration {
            hhi: round_to(hhi, 4),
            top3_share: round_to(percentage(top3, total), 1),
            countries_for_80_percent,
            level,
        }
    }

    pub fn market_recommendations(
        &self,
        countries: &[CountryMetrics],
        concentration: &MarketConcentration,
        overall_conversion: f64,
    ) -> Vec<MarketRecommendation> {
        let mut recommendations: Vec<MarketRecommendation> = countries
            .iter()
            .filter(|c| c.country != UNKNOWN_COUNTRY)
            .filter_map(|c| self.recommend_for(c, overall_conversion))
            .collect();

        if concentration.level == ConcentrationLevel::High {
            recommendations.push(MarketRecommendation {
                country: None,
                action: MarketAction::Diversify,
                message: format!(
                    "Lead volume is highly concentrated (HHI {:.2}); diversify into additional markets",
                    concentration.hhi
                ),
                priority: ActionPriority::High,
            });
        }

        recommendations.sort_by(|a, b| a.priority.cmp(&b.priority));
        recommendations
    }

    fn recommend_for(&self, c: &CountryMetrics, overall_conversion: f64) -> Option<MarketRecommendation> {
        let (action, message, priority) = if c.lead_count < self.config.min_sample_size {
            (
                MarketAction::Investigate,
                format!(
                    "Only {} leads from {}; collect more data before drawing conclusions",
                    c.lead_count, c.country
                ),
                ActionPriority::Low,
            )
        } else if c.conversion_rate > 0.0
            && c.conversion_rate >= overall_conversion * EXPANSION_CONVERSION_FACTOR
            && c.share_of_leads < self.config.expansion_share_ceiling
        {
            (
                MarketAction::Expand,
                format!(
                    "{} converts at {:.1}% vs {:.1}% overall with only {:.1}% of leads; increase marketing investment",
                    c.country, c.conversion_rate, overall_conversion, c.share_of_leads
                ),
                ActionPriority::High,
            )
        } else if c.share_of_leads >= self.config.optimization_share_floor
            && c.conversion_rate <= overall_conversion * OPTIMIZATION_CONVERSION_FACTOR
        {
            (
                MarketAction::Optimize,
                format!(
                    "{} holds {:.1}% of leads but converts at {:.1}%; tighten lead qualification",
                    c.country, c.share_of_leads, c.conversion_rate
                ),
                ActionPriority::High,
            )
        } else if c.rank == 1 {
            (
                MarketAction::Maintain,
                format!(
                    "{} is the top performing market; protect current investment",
                    c.country
                ),
                ActionPriority::Medium,
            )
        } else {
            return None;
        };

        Some(MarketRecommendation {
            country: Some(c.country.clone()),
            action,
            message,
            priority,
        })
    }

    /// 執行完整地理分析
    pub fn run_complete_analysis(&self, leads: &[Lead], now: DateTime<Utc>) -> GeoAnalysis {
        let converted = leads.iter().filter(|l| l.converted).count();
        let overall_conversion = percentage(converted, leads.len());

        let countries = self.country_performance(leads);
        let regional_analysis = self.regional_analysis(leads);
        let market_concentration = self.market_concentration(leads);
        let recommendations =
            self.market_recommendations(&countries, &market_concentration, overall_conversion);

        let summary = GeoSummary {
            total_leads: leads.len(),
            total_countries: countries.len(),
            total_regions: regional_analysis.len(),
            top_country: countries.first().map(|c| c.country.clone()),
            top_region: regional_analysis.first().map(|r| r.region.clone()),
            overall_conversion_rate: round_to(overall_conversion, 1),
            hhi: market_concentration.hhi,
        };

        tracing::debug!(
            "Geo analysis covered {} countries in {} regions",
            summary.total_countries,
            summary.total_regions
        );

        GeoAnalysis {
            status: "success".to_string(),
            timestamp: now,
            country_analysis: self.country_analysis(countries, overall_conversion),
            regional_analysis,
            market_concentration,
            recommendations,
            summary,
        }
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn leads_for(country: &str, count: usize, converted: usize, first_id: i64) -> Vec<Lead> {
        (0..count)
            .map(|i| Lead {
                id: first_id + i as i64,
                name: format!("{} lead {}", country, i),
                email: None,
                company: None,
                country: Some(country.to_string()),
                source: None,
                status: None,
                deal_value: 1_000.0,
                interactions: 1,
                created_at: now(),
                last_activity_at: None,
                converted: i < converted,
            })
            .collect()
    }

    fn sample_leads() -> Vec<Lead> {
        let mut leads = leads_for("USA", 50, 10, 1);
        leads.extend(leads_for("germany", 5, 3, 100));
        leads.extend(leads_for("Brazil", 2, 0, 200));
        leads
    }

    fn engine() -> GeoEngine {
        GeoEngine::new(GeoConfig::default()).unwrap()
    }

    #[test]
    fn test_country_performance_ranking() {
        let countries = engine().country_performance(&sample_leads());

        assert_eq!(countries.len(), 3);
        assert_eq!(countries[0].country, "Germany");
        assert_eq!(countries[0].rank, 1);
        assert_eq!(countries[0].conversion_rate, 60.0);
        assert_eq!(countries[0].region, "Europe");
        assert_eq!(countries[1].country, "United States");
        assert_eq!(countries[1].lead_count, 50);
        assert_eq!(countries[1].share_of_leads, 87.7);
        assert_eq!(countries[1].total_pipeline_value, 50_000.0);
        assert_eq!(countries[2].country, "Brazil");
        assert_eq!(countries[2].rank, 3);
    }

    #[test]
    fn test_regional_analysis() {
        let regions = engine().regional_analysis(&sample_leads());

        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].region, "North America");
        assert_eq!(regions[0].countries, vec!["United States".to_string()]);
        assert_eq!(regions[1].region, "Europe");
        assert_eq!(regions[1].conversion_rate, 60.0);
        assert_eq!(regions[2].region, "Latin America");
    }

    #[test]
    fn test_market_concentration_bounds() {
        let engine = engine();

        let single = engine.market_concentration(&leads_for("Japan", 4, 0, 1));
        assert_eq!(single.hhi, 1.0);
        assert_eq!(single.level, ConcentrationLevel::High);
        assert_eq!(single.countries_for_80_percent, 1);

        let mut spread = Vec::new();
        for (i, country) in ["Japan", "France", "Canada", "Chile", "India", "Kenya", "Spain", "Peru"]
            .iter()
            .enumerate()
        {
            spread.extend(leads_for(country, 2, 0, (i as i64) * 10));
        }
        let spread = engine.market_concentration(&spread);
        assert_eq!(spread.hhi, 0.125);
        assert_eq!(spread.level, ConcentrationLevel::Low);
        assert_eq!(spread.top3_share, 37.5);
        assert_eq!(spread.countries_for_80_percent, 7);

        let empty = engine.market_concentration(&[]);
        assert_eq!(empty.hhi, 0.0);
        assert_eq!(empty.countries_for_80_percent, 0);
    }

    #[test]
    fn test_market_recommendations() {
        let analysis = engine().run_complete_analysis(&sample_leads(), now());
        let recs = &analysis.recommendations;

        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].action, MarketAction::Expand);
        assert_eq!(recs[0].country.as_deref(), Some("Germany"));
        assert_eq!(recs[1].action, MarketAction::Diversify);
        assert_eq!(recs[1].country, None);
        assert_eq!(recs[2].action, MarketAction::Investigate);
        assert_eq!(recs[2].country.as_deref(), Some("Brazil"));
    }

    #[test]
    fn test_optimize_recommendation_for_large_weak_market() {
        let mut leads = leads_for("United Kingdom", 20, 1, 1);
        leads.extend(leads_for("France", 20, 10, 100));
        leads.extend(leads_for("Italy", 20, 10, 200));

        let analysis = engine().run_complete_analysis(&leads, now());
        let uk = analysis
            .recommendations
            .iter()
            .find(|r| r.country.as_deref() == Some("United Kingdom"))
            .unwrap();

        assert_eq!(uk.action, MarketAction::Optimize);
        assert_eq!(
            analysis.country_analysis.underperformers,
            vec!["United Kingdom".to_string()]
        );
    }

    #[test]
    fn test_complete_analysis_summary() {
        let mut leads = sample_leads();
        leads.extend(leads_for("", 1, 0, 500));

        let analysis = engine().run_complete_analysis(&leads, now());

        assert_eq!(analysis.status, "success");
        assert_eq!(analysis.summary.total_leads, 58);
        assert_eq!(analysis.summary.total_countries, 4);
        assert_eq!(analysis.summary.total_regions, 4);
        assert_eq!(analysis.summary.top_country.as_deref(), Some("Germany"));
        assert_eq!(analysis.summary.top_region.as_deref(), Some("North America"));
        assert_eq!(analysis.summary.overall_conversion_rate, 22.4);
        assert!(!analysis
            .country_analysis
            .top_performers
            .contains(&UNKNOWN_COUNTRY.to_string()));
    }

    #[test]
    fn test_empty_input() {
        let analysis = engine().run_complete_analysis(&[], now());
        assert_eq!(analysis.summary.total_leads, 0);
        assert!(analysis.country_analysis.countries.is_empty());
        assert!(analysis.recommendations.is_empty());
        assert_eq!(analysis.summary.top_country, None);
    }

    #[test]
    fn test_invalid_config_fails_engine_init() {
        let result = GeoEngine::new(GeoConfig {
            concentration_moderate: 0.5,
            concentration_high: 0.25,
            ..GeoConfig::default()
        });
        assert!(matches!(result, Err(ServiceError::EngineInitError { .. })));

        let result = GeoEngine::new(GeoConfig {
            min_sample_size: 0,
            ..GeoConfig::default()
        });
        assert!(result.is_err());
    }
}
