//! Reminder entries: a wall-clock time in a named time zone plus the message
//! to post when it comes around

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use minijinja::{context, Environment};

use crate::application::errors::PluginError;

/// Hour and minute of the day, 24h clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, PluginError> {
        if hour > 23 || minute > 59 {
            return Err(PluginError::InvalidTime(format!("{}:{:02}", hour, minute)));
        }
        Ok(Self { hour, minute })
    }

    fn naive(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

/// Accepts `15:04`, `9:30`, `9:30am`, `12:15 PM` and `9am`.
impl FromStr for TimeOfDay {
    type Err = PluginError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PluginError::InvalidTime(s.to_string());
        let lower = s.trim().to_ascii_lowercase();

        let (clock, pm) = if let Some(rest) = lower.strip_suffix("am") {
            (rest.trim_end(), Some(false))
        } else if let Some(rest) = lower.strip_suffix("pm") {
            (rest.trim_end(), Some(true))
        } else {
            (lower.as_str(), None)
        };

        let (hour, minute) = match clock.split_once(':') {
            Some((h, m)) if m.len() == 2 => (h, m),
            None if pm.is_some() => (clock, "00"),
            _ => return Err(invalid()),
        };
        if hour.is_empty() || hour.len() > 2 {
            return Err(invalid());
        }
        if !hour.bytes().chain(minute.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;

        let hour = match pm {
            None => hour,
            Some(_) if !(1..=12).contains(&hour) => return Err(invalid()),
            Some(false) => hour % 12,
            Some(true) => hour % 12 + 12,
        };
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.hour, self.minute)
    }
}

/// A message template rendered without parameters
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    name: String,
    source: Arc<str>,
}

impl MessageTemplate {
    /// Compile-checks the template so syntax errors surface at load time
    pub fn parse(name: impl Into<String>, source: impl Into<String>) -> Result<Self, PluginError> {
        let name = name.into();
        let source: Arc<str> = Arc::from(source.into());
        let env = Environment::new();
        env.template_from_str(&source)
            .map_err(|e| PluginError::Template(format!("failed to parse {}: {}", name, e)))?;
        Ok(Self { name, source })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self) -> Result<String, minijinja::Error> {
        Environment::new().render_str(&self.source, context! {})
    }
}

/// One entry of a reminder set
#[derive(Debug, Clone)]
pub struct Reminder {
    pub time: TimeOfDay,
    pub tz: Tz,
    pub template: MessageTemplate,
}

impl Reminder {
    pub fn new(time: TimeOfDay, tz: Tz, template: MessageTemplate) -> Self {
        Self { time, tz, template }
    }

    /// Builds an entry from its textual form, e.g. `("9:00", "America/New_York")`
    pub fn parse(time: &str, location: &str, template: MessageTemplate) -> Result<Self, PluginError> {
        let tz = parse_tz(location)?;
        let time = time.parse()?;
        Ok(Self::new(time, tz, template))
    }

    /// Next instant strictly after `now` at which this reminder fires.
    ///
    /// Today's occurrence (in the reminder's own zone) is used while it is
    /// still ahead of `now`; once reached it rolls over to the following day.
    pub fn next_occurrence(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.with_timezone(&self.tz).date_naive();
        let candidate = self.at_local(today);
        if candidate > now {
            return candidate;
        }
        today
            .succ_opt()
            .map(|tomorrow| self.at_local(tomorrow))
            .unwrap_or(candidate + Duration::days(1))
    }

    fn at_local(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_time(self.time.naive());
        let local = match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(t) => Some(t),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            // skipped by a DST jump, fire right after it
            LocalResult::None => self.tz.from_local_datetime(&(naive + Duration::hours(1))).earliest(),
        };
        local
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
    }
}

impl fmt::Display for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.time, self.tz.name())
    }
}

/// Resolves an IANA zone name such as `Europe/Dublin`
pub fn parse_tz(name: &str) -> Result<Tz, PluginError> {
    name.parse::<Tz>()
        .map_err(|_| PluginError::InvalidTimeZone(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn template(text: &str) -> MessageTemplate {
        MessageTemplate::parse("test", text).unwrap()
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!("9:00".parse::<TimeOfDay>().unwrap(), TimeOfDay { hour: 9, minute: 0 });
        assert_eq!("15:04".parse::<TimeOfDay>().unwrap(), TimeOfDay { hour: 15, minute: 4 });
        assert_eq!("9:30pm".parse::<TimeOfDay>().unwrap(), TimeOfDay { hour: 21, minute: 30 });
        assert_eq!("12:15 AM".parse::<TimeOfDay>().unwrap(), TimeOfDay { hour: 0, minute: 15 });
        assert_eq!("12pm".parse::<TimeOfDay>().unwrap(), TimeOfDay { hour: 12, minute: 0 });
    }

    #[test]
    fn test_parse_time_of_day_rejects_garbage() {
        for bad in ["", "25:00", "9:60", "9", "9:5", "ab:cd", "13:00pm", "+9:00", "noon"] {
            assert!(
                matches!(bad.parse::<TimeOfDay>(), Err(PluginError::InvalidTime(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_unknown_time_zone_rejected() {
        let err = Reminder::parse("9:00", "Mars/Olympus_Mons", template("hi")).unwrap_err();
        assert!(matches!(err, PluginError::InvalidTimeZone(name) if name == "Mars/Olympus_Mons"));
    }

    #[test]
    fn test_template_syntax_error_rejected() {
        assert!(matches!(
            MessageTemplate::parse("broken", "{% if %}"),
            Err(PluginError::Template(_))
        ));
    }

    #[test]
    fn test_template_renders_without_parameters() {
        let t = template("Handoff time! {{ 1 + 1 }} rotations");
        assert_eq!(t.render().unwrap(), "Handoff time! 2 rotations");
    }

    #[test]
    fn test_next_occurrence_same_day() {
        let r = Reminder::parse("14:00", "UTC", template("x")).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(r.next_occurrence(now), Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_next_occurrence_rolls_over_when_passed() {
        let r = Reminder::parse("9:00", "UTC", template("x")).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 1).unwrap();
        assert_eq!(r.next_occurrence(now), Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_next_occurrence_exactly_now_is_tomorrow() {
        let r = Reminder::parse("9:00", "UTC", template("x")).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        assert_eq!(r.next_occurrence(now), Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_next_occurrence_uses_reminder_zone() {
        // 09:00 in New York is 14:00 UTC in winter
        let r = Reminder::parse("9:00", "America/New_York", template("x")).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(r.next_occurrence(now), Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_next_occurrence_across_zone_date_line() {
        // 02:00 UTC on Jan 15 is still Jan 14 evening in Los Angeles
        let r = Reminder::parse("20:00", "America/Los_Angeles", template("x")).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 2, 0, 0).unwrap();
        assert_eq!(r.next_occurrence(now), Utc.with_ymd_and_hms(2024, 1, 15, 4, 0, 0).unwrap());
    }

    #[test]
    fn test_next_occurrence_in_dst_gap() {
        // 02:30 does not exist in New York on 2024-03-10
        let r = Reminder::parse("2:30", "America/New_York", template("x")).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 5, 0, 0).unwrap();
        assert_eq!(r.next_occurrence(now), Utc.with_ymd_and_hms(2024, 3, 10, 7, 30, 0).unwrap());
    }
}
