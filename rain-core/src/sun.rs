//! Sunrise and sunset times for a GPS position.
//!
//! The `sunrise` engine works in UTC; results are shifted into the time zone of
//! whatever date or reference instant the caller supplies.

use chrono::{DateTime, NaiveDate, TimeZone};
use sunrise::{Coordinates, SolarDay, SolarEvent};
use tracing::{error, warn};

use crate::model::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunEvent {
    Sunrise,
    Sunset,
}

impl From<SunEvent> for SolarEvent {
    fn from(event: SunEvent) -> Self {
        match event {
            SunEvent::Sunrise => SolarEvent::Sunrise,
            SunEvent::Sunset => SolarEvent::Sunset,
        }
    }
}

/// The event on calendar day `date`, expressed in `tz`.
///
/// `None` when the sun does not rise or set that day (polar day or night).
pub fn event_on<Tz: TimeZone>(
    point: GeoPoint,
    date: NaiveDate,
    event: SunEvent,
    tz: &Tz,
) -> Option<DateTime<Tz>> {
    if let Err(err) = point.validate() {
        error!(error = %err, "no sun event for invalid position");
        return None;
    }
    let coords = Coordinates::new(point.lat, point.lon)?;
    let utc = SolarDay::new(coords, date).event_time(event.into());

    // The engine reports polar day/night as the Unix epoch.
    if (utc.date_naive() - date).num_days().abs() > 1 {
        warn!(?event, %date, lat = point.lat, lon = point.lon, "no sun event on this day");
        return None;
    }
    Some(utc.with_timezone(tz))
}

/// Today's event if it has not happened yet at `reference`, else tomorrow's.
pub fn next_event<Tz: TimeZone>(
    point: GeoPoint,
    reference: &DateTime<Tz>,
    event: SunEvent,
) -> Option<DateTime<Tz>> {
    let tz = reference.timezone();
    let today = reference.date_naive();

    let candidate = event_on(point, today, event, &tz)?;
    if candidate >= *reference {
        return Some(candidate);
    }
    event_on(point, today.succ_opt()?, event, &tz).filter(|next| next >= reference)
}

pub fn sunrise_on<Tz: TimeZone>(point: GeoPoint, date: NaiveDate, tz: &Tz) -> Option<DateTime<Tz>> {
    event_on(point, date, SunEvent::Sunrise, tz)
}

pub fn sunset_on<Tz: TimeZone>(point: GeoPoint, date: NaiveDate, tz: &Tz) -> Option<DateTime<Tz>> {
    event_on(point, date, SunEvent::Sunset, tz)
}

pub fn next_sunrise<Tz: TimeZone>(point: GeoPoint, reference: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    next_event(point, reference, SunEvent::Sunrise)
}

pub fn next_sunset<Tz: TimeZone>(point: GeoPoint, reference: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    next_event(point, reference, SunEvent::Sunset)
}
