use anyhow::Context;
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};

// Sellers plan against São Paulo civil time; Brazil has no DST since 2019.
const BRT_OFFSET_SECS: i32 = -3 * 3600;

pub fn resolve_today(today_arg: Option<&str>, now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    if let Some(s) = today_arg {
        return NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .with_context(|| format!("invalid date {s:?}, expected YYYY-MM-DD"));
    }

    let brt = chrono::FixedOffset::east_opt(BRT_OFFSET_SECS).context("invalid BRT offset")?;
    Ok(now_utc.with_timezone(&brt).date_naive())
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn weekday_name_pt(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Segunda-feira",
        Weekday::Tue => "Terça-feira",
        Weekday::Wed => "Quarta-feira",
        Weekday::Thu => "Quinta-feira",
        Weekday::Fri => "Sexta-feira",
        Weekday::Sat => "Sábado",
        Weekday::Sun => "Domingo",
    }
}
