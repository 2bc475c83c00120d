use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    pub time: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub time_slots: Vec<TimeSlot>,
}

/// Opening hours of the lounge. Slots start at `opening` and repeat every
/// `interval_minutes`; the last slot starts before `closing`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    pub opening: String,
    pub closing: String,
    pub interval_minutes: u32,
    #[serde(default)]
    pub closed_weekdays: Vec<String>,
    #[serde(default)]
    pub closed_dates: Vec<NaiveDate>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            opening: "10:00".to_string(),
            closing: "22:00".to_string(),
            interval_minutes: 60,
            closed_weekdays: Vec::new(),
            closed_dates: Vec::new(),
        }
    }
}

impl Schedule {
    pub fn validate(&self) -> anyhow::Result<()> {
        let opening = parse_time(&self.opening)?;
        let closing = parse_time(&self.closing)?;
        if closing <= opening {
            return Err(anyhow::anyhow!(
                "closing time {} must be after opening time {}",
                self.closing,
                self.opening
            ));
        }
        if self.interval_minutes == 0 {
            return Err(anyhow::anyhow!("slot interval must be positive"));
        }
        for day in &self.closed_weekdays {
            parse_weekday(day)?;
        }
        Ok(())
    }

    pub fn is_open_on(&self, date: NaiveDate) -> bool {
        let weekday = date.format("%a").to_string().to_lowercase();
        !self.closed_dates.contains(&date)
            && !self
                .closed_weekdays
                .iter()
                .any(|d| d.to_lowercase() == weekday)
    }

    /// Slot start times for `date` in chronological order; empty when the
    /// lounge is closed that day.
    pub fn slot_times(&self, date: NaiveDate) -> Vec<NaiveTime> {
        if !self.is_open_on(date) {
            return Vec::new();
        }
        let (Ok(opening), Ok(closing)) = (parse_time(&self.opening), parse_time(&self.closing))
        else {
            tracing::warn!("schedule has unparsable opening hours, no slots generated");
            return Vec::new();
        };
        if self.interval_minutes == 0 {
            return Vec::new();
        }

        let step = Duration::minutes(self.interval_minutes as i64);
        let mut slots = Vec::new();
        let mut current = date.and_time(opening);
        let end = date.and_time(closing);
        while current < end {
            slots.push(current.time());
            current += step;
        }
        slots
    }

    pub fn closing_on(&self, date: NaiveDate) -> Option<NaiveDateTime> {
        parse_time(&self.closing).ok().map(|t| date.and_time(t))
    }

    /// Start time of the slot labelled `label` on `date`, if the schedule
    /// offers it that day.
    pub fn find_slot(&self, date: NaiveDate, label: &str) -> Option<NaiveTime> {
        let wanted = parse_slot_label(label)?;
        self.slot_times(date).into_iter().find(|t| *t == wanted)
    }

    pub fn to_human_readable(&self) -> String {
        let mut text = format!("{}-{}", self.opening, self.closing);
        if !self.closed_weekdays.is_empty() {
            let closed = self
                .closed_weekdays
                .iter()
                .map(|d| capitalize(d))
                .collect::<Vec<_>>()
                .join(", ");
            text.push_str(&format!(" (closed {closed})"));
        }
        text
    }
}

/// Formats a slot start as the customer-facing label, e.g. "2:00 PM".
pub fn format_slot_label(time: NaiveTime) -> String {
    let hour = time.hour();
    let am_pm = if hour < 12 { "AM" } else { "PM" };
    let display_hour = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{display_hour}:{:02} {am_pm}", time.minute())
}

/// Accepts "2:00 PM" style labels as well as 24-hour "14:00".
pub fn parse_slot_label(label: &str) -> Option<NaiveTime> {
    let label = label.trim();
    NaiveTime::parse_from_str(&label.to_uppercase(), "%I:%M %p")
        .ok()
        .or_else(|| NaiveTime::parse_from_str(label, "%H:%M").ok())
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().to_string() + &c.as_str().to_lowercase(),
    }
}

fn parse_weekday(s: &str) -> anyhow::Result<()> {
    match s.to_lowercase().as_str() {
        "mon" | "tue" | "wed" | "thu" | "fri" | "sat" | "sun" => Ok(()),
        _ => Err(anyhow::anyhow!("invalid weekday: {s}")),
    }
}

fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
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
