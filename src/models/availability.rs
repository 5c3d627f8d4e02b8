use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use serde::Serialize;

/// A recurring weekly window in which a doctor sees patients.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AvailabilityTemplate {
    pub availability_id: i64,
    pub doctor_id: i64,
    #[serde(with = "weekday_name")]
    pub day_of_week: Weekday,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

impl AvailabilityTemplate {
    /// Bookable start times: `start`, `start + slot`, ... strictly before `end`.
    pub fn slot_times(&self, slot_minutes: u32) -> Vec<NaiveTime> {
        let step = Duration::minutes(i64::from(slot_minutes.max(1)));
        let mut times = Vec::new();
        let mut t = self.start_time;
        while t < self.end_time {
            times.push(t);
            let (next, wrapped) = t.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            t = next;
        }
        times
    }

    pub fn offers(&self, time: NaiveTime, slot_minutes: u32) -> bool {
        self.slot_times(slot_minutes).contains(&time)
    }
}

/// One template window on a concrete date, with the times still open.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimeWindow {
    pub availability_id: i64,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
    #[serde(serialize_with = "hhmm::serialize_vec")]
    pub free_times: Vec<NaiveTime>,
}

impl TimeWindow {
    pub fn describe(&self) -> String {
        let free = self
            .free_times
            .iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} {}-{} (open: {free})",
            weekday_full_name(self.date.weekday()),
            self.start.format("%H:%M"),
            self.end.format("%H:%M"),
        )
    }
}

pub fn templates_to_human_readable(templates: &[AvailabilityTemplate]) -> String {
    if templates.is_empty() {
        return String::new();
    }

    let mut sorted = templates.to_vec();
    sorted.sort_by_key(|t| (t.day_of_week.num_days_from_monday(), t.start_time));

    sorted
        .iter()
        .map(|t| {
            format!(
                "{}: {}-{}",
                weekday_full_name(t.day_of_week),
                t.start_time.format("%H:%M"),
                t.end_time.format("%H:%M")
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn weekday_full_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Accepts `Mon`, `monday`, `TUESDAY` etc.
pub fn parse_weekday(s: &str) -> anyhow::Result<Weekday> {
    let lower = s.trim().to_lowercase();
    let day = match lower.get(..3).unwrap_or("") {
        "mon" => Weekday::Mon,
        "tue" => Weekday::Tue,
        "wed" => Weekday::Wed,
        "thu" => Weekday::Thu,
        "fri" => Weekday::Fri,
        "sat" => Weekday::Sat,
        "sun" => Weekday::Sun,
        _ => return Err(anyhow::anyhow!("invalid weekday: {s}")),
    };
    if lower.len() > 3 && lower != weekday_full_name(day).to_lowercase() {
        return Err(anyhow::anyhow!("invalid weekday: {s}"));
    }
    Ok(day)
}

/// Strict 24-hour `HH:MM`.
pub fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].len() != 2 {
        return Err(anyhow::anyhow!("invalid time format: {s}"));
    }
    let hour: u32 = parts[0]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid hour in: {s}"))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid minute in: {s}"))?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| anyhow::anyhow!("time out of range: {s}"))
}

/// Strict ISO `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("invalid date format: {s}"))
}

/// The next date on or after `from` that falls on `day`.
pub fn next_weekday(from: NaiveDate, day: Weekday) -> NaiveDate {
    let ahead = (7 + day.num_days_from_monday() - from.weekday().num_days_from_monday()) % 7;
    from + Duration::days(i64::from(ahead))
}

pub mod hhmm {
    use chrono::NaiveTime;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn serialize_vec<S: Serializer>(times: &[NaiveTime], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(times.iter().map(|t| t.format("%H:%M").to_string()))
    }
}

pub mod weekday_name {
    use chrono::Weekday;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(day: &Weekday, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(super::weekday_full_name(*day))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> NaiveTime {
        parse_time(s).unwrap()
    }

    fn template(day: Weekday, start: &str, end: &str) -> AvailabilityTemplate {
        AvailabilityTemplate {
            availability_id: 1,
            doctor_id: 1,
            day_of_week: day,
            start_time: t(start),
            end_time: t(end),
        }
    }

    #[test]
    fn test_parse_weekday_variants() {
        assert_eq!(parse_weekday("mon").unwrap(), Weekday::Mon);
        assert_eq!(parse_weekday("Tuesday").unwrap(), Weekday::Tue);
        assert_eq!(parse_weekday(" SUNDAY ").unwrap(), Weekday::Sun);
        assert!(parse_weekday("xyz").is_err());
        assert!(parse_weekday("monkey").is_err());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(t("09:00"), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("10am").is_err());
        assert!(parse_time("10:5").is_err());
    }

    #[test]
    fn test_parse_date_rejects_relative_phrases() {
        assert!(parse_date("2025-06-17").is_ok());
        assert!(parse_date("next week").is_err());
        assert!(parse_date("17/06/2025").is_err());
    }

    #[test]
    fn test_slot_times_half_hour_grid() {
        let tpl = template(Weekday::Tue, "09:00", "12:00");
        let times = tpl.slot_times(30);
        assert_eq!(times.len(), 6);
        assert_eq!(times.first(), Some(&t("09:00")));
        assert_eq!(times.last(), Some(&t("11:30")));
        assert!(tpl.offers(t("10:00"), 30));
        assert!(!tpl.offers(t("10:15"), 30));
        assert!(!tpl.offers(t("12:00"), 30));
    }

    #[test]
    fn test_slot_times_near_midnight_does_not_wrap() {
        let tpl = template(Weekday::Fri, "23:00", "23:59");
        assert_eq!(tpl.slot_times(30), vec![t("23:00"), t("23:30")]);
    }

    #[test]
    fn test_next_weekday() {
        // 2025-06-16 is a Monday
        let monday = parse_date("2025-06-16").unwrap();
        assert_eq!(next_weekday(monday, Weekday::Tue), parse_date("2025-06-17").unwrap());
        assert_eq!(next_weekday(monday, Weekday::Mon), monday);
        assert_eq!(next_weekday(monday, Weekday::Sun), parse_date("2025-06-22").unwrap());
    }

    #[test]
    fn test_to_human_readable() {
        let templates = vec![
            template(Weekday::Fri, "10:00", "16:00"),
            template(Weekday::Mon, "09:00", "17:00"),
        ];
        assert_eq!(
            templates_to_human_readable(&templates),
            "Monday: 09:00-17:00, Friday: 10:00-16:00"
        );
        assert_eq!(templates_to_human_readable(&[]), "");
    }
}
