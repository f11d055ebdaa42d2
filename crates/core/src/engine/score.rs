use crate::domain::event::{CommercialEvent, ImpactTier};
use crate::domain::suggestion::DateScore;
use crate::engine::calendar::EventCalendar;
use crate::engine::params::ScoringParams;
use crate::error::EngineError;
use chrono::{Datelike, NaiveDate, Weekday};

pub(crate) const WEEKEND_REASON: &str = "Fim de semana - mais pessoas disponíveis para compras";
const FRIDAY_REASON: &str = "Sexta-feira - início do fim de semana";
const PAYDAY_REASON: &str = "Período de pagamento - consumidores com mais poder de compra";
const HOLIDAY_REASON: &str = "Movimento reduzido próximo a feriado prolongado";

pub(crate) const GENERIC_TIPS: [&str; 3] = [
    "Divulgue o bazar com 7 dias de antecedência",
    "Prepare fotos de qualidade dos produtos",
    "Ofereça formas de pagamento variadas (PIX, cartão, dinheiro)",
];

/// Scores a single calendar date. Pure and deterministic in `(date, calendar)`.
#[derive(Debug, Clone, Default)]
pub struct ScoreCalculator {
    params: ScoringParams,
}

impl ScoreCalculator {
    pub fn new(params: ScoringParams) -> Result<Self, EngineError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ScoringParams {
        &self.params
    }

    pub fn score(&self, date: NaiveDate, calendar: &EventCalendar) -> DateScore {
        let p = &self.params;
        let mut score = p.base_score;
        let mut reasons: Vec<String> = Vec::new();

        match date.weekday() {
            Weekday::Sat | Weekday::Sun => {
                score += p.weekend_bonus;
                reasons.push(WEEKEND_REASON.to_string());
            }
            Weekday::Fri if p.friday_bonus > 0 => {
                score += p.friday_bonus;
                reasons.push(FRIDAY_REASON.to_string());
            }
            _ => {}
        }

        let day = date.day();
        if p.is_payday(day) {
            score += p.payday_bonus;
            reasons.push(PAYDAY_REASON.to_string());
        } else if p.is_late_month(day) {
            score -= p.late_month_penalty;
        }

        let lookback = p.lookback_days();
        let mut anchor: Option<(i64, &CommercialEvent)> = None;
        for event in calendar.events() {
            if event.impact_tier == ImpactTier::Low {
                continue;
            }
            let Some(event_date) = event.resolve_from(date, lookback) else {
                continue;
            };
            let days_until = (event_date - date).num_days();

            if p.is_sweet_spot(days_until) {
                // Closest upcoming event wins; calendar order breaks exact ties.
                if anchor.map_or(true, |(best, _)| days_until < best) {
                    anchor = Some((days_until, event));
                }
            } else if days_until > 0 && days_until < p.sweet_spot_min_days {
                score -= p.too_close_penalty;
            } else if days_until < 0 && days_until >= -p.too_late_days {
                score -= p.too_late_penalty;
            }
        }

        let mut tips: Vec<String> = Vec::new();
        let mut nearby_event = None;
        if let Some((days_until, event)) = anchor {
            score += p.tier_bonus(event.impact_tier);
            reasons = Vec::with_capacity(event.reasons.len() + 1);
            reasons.push(format!(
                "{days_until} dias antes {} {} - momento ideal para vender",
                event.preposition, event.name
            ));
            for reason in &event.reasons {
                push_unique(&mut reasons, reason);
            }
            tips = event.tips.clone();
            nearby_event = Some(event.name.clone());
        }

        if self.near_long_holiday(date, calendar) {
            score -= p.holiday_penalty;
            push_unique(&mut reasons, HOLIDAY_REASON);
        }

        if tips.is_empty() {
            tips = generic_tips();
        }

        DateScore {
            date,
            score: clamp_score(score),
            reasons,
            tips,
            nearby_event,
        }
    }

    fn near_long_holiday(&self, date: NaiveDate, calendar: &EventCalendar) -> bool {
        let p = &self.params;
        calendar
            .events()
            .iter()
            .filter(|e| e.long_holiday)
            .filter_map(|e| e.resolve_from(date, p.lookback_days()))
            .any(|d| (d - date).num_days().abs() <= p.holiday_radius_days)
    }
}

fn push_unique(reasons: &mut Vec<String>, reason: &str) {
    if !reasons.iter().any(|r| r == reason) {
        reasons.push(reason.to_string());
    }
}

pub(crate) fn generic_tips() -> Vec<String> {
    GENERIC_TIPS.iter().map(|s| s.to_string()).collect()
}

fn clamp_score(raw: i32) -> u8 {
    // Lossless after the clamp.
    raw.clamp(0, 100) as u8
}
