//! crates/descubre_core/src/trip.rs
//!
//! The trip request collected by the planner wizard, its completeness rules and
//! its validation into a request the planner can act on.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::{ExperienceType, Level, Priority};
use crate::ports::DestinationFilter;

/// Number of steps in the planner wizard.
pub const WIZARD_STEPS: u8 = 5;

/// Why a trip request cannot be used for generation yet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TripError {
    #[error("province and district must be selected")]
    MissingLocation,
    #[error("start and end dates must be selected")]
    MissingDates,
    #[error("end date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("an experience type must be selected")]
    MissingExperience,
    #[error("a priority must be selected")]
    MissingPriority,
}

/// Trip parameters as submitted by the planner form. Unset fields arrive as
/// empty strings and are held as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripRequest {
    #[serde(rename = "provinceId", default, deserialize_with = "blank_as_none")]
    pub province_id: Option<Uuid>,
    #[serde(rename = "districtId", default, deserialize_with = "blank_as_none")]
    pub district_id: Option<Uuid>,
    #[serde(rename = "dateStart", default, deserialize_with = "blank_as_none")]
    pub date_start: Option<NaiveDate>,
    #[serde(rename = "dateEnd", default, deserialize_with = "blank_as_none")]
    pub date_end: Option<NaiveDate>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub experience_type: Option<ExperienceType>,
    #[serde(default)]
    pub effort_level: Level,
    #[serde(rename = "price_range", default)]
    pub budget_level: Level,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub priority: Option<Priority>,
}

/// A complete, checked trip request.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidTrip {
    pub province_id: Uuid,
    pub district_id: Uuid,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub days: u32,
    pub experience_type: ExperienceType,
    pub effort_level: Level,
    pub budget_level: Level,
    pub priority: Priority,
}

impl TripRequest {
    /// True when both dates are set and the end precedes the start.
    pub fn has_invalid_date_range(&self) -> bool {
        matches!((self.date_start, self.date_end), (Some(s), Some(e)) if e < s)
    }

    /// Inclusive number of days between the dates, when both are set and ordered.
    pub fn day_count(&self) -> Option<u32> {
        let (start, end) = (self.date_start?, self.date_end?);
        let days = (end - start).num_days() + 1;
        u32::try_from(days).ok().filter(|d| *d > 0)
    }

    /// The wizard step the form is on, from 1 (location) to 5 (ready to generate).
    pub fn wizard_step(&self) -> u8 {
        if self.province_id.is_none() || self.district_id.is_none() {
            1
        } else if self.date_start.is_none() || self.date_end.is_none() {
            2
        } else if self.experience_type.is_none() {
            3
        } else if self.priority.is_none() || self.has_invalid_date_range() {
            4
        } else {
            WIZARD_STEPS
        }
    }

    pub fn is_complete(&self) -> bool {
        self.wizard_step() == WIZARD_STEPS
    }

    pub fn validate(&self) -> Result<ValidTrip, TripError> {
        let (province_id, district_id) = match (self.province_id, self.district_id) {
            (Some(p), Some(d)) => (p, d),
            _ => return Err(TripError::MissingLocation),
        };
        let (date_start, date_end) = match (self.date_start, self.date_end) {
            (Some(s), Some(e)) => (s, e),
            _ => return Err(TripError::MissingDates),
        };
        let days = self.day_count().ok_or(TripError::InvalidDateRange {
            start: date_start,
            end: date_end,
        })?;
        let experience_type = self.experience_type.ok_or(TripError::MissingExperience)?;
        let priority = self.priority.ok_or(TripError::MissingPriority)?;

        Ok(ValidTrip {
            province_id,
            district_id,
            date_start,
            date_end,
            days,
            experience_type,
            effort_level: self.effort_level,
            budget_level: self.budget_level,
            priority,
        })
    }
}

impl ValidTrip {
    pub fn destination_filter(&self) -> DestinationFilter {
        DestinationFilter {
            district_id: self.district_id,
            experience_type: self.experience_type,
            max_effort: self.effort_level,
            max_budget: self.budget_level,
        }
    }

    /// Back to the wire shape, for echoing the request in responses.
    pub fn to_request(&self) -> TripRequest {
        TripRequest {
            province_id: Some(self.province_id),
            district_id: Some(self.district_id),
            date_start: Some(self.date_start),
            date_end: Some(self.date_end),
            experience_type: Some(self.experience_type),
            effort_level: self.effort_level,
            budget_level: self.budget_level,
            priority: Some(self.priority),
        }
    }
}

fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn complete() -> TripRequest {
        TripRequest {
            province_id: Some(Uuid::new_v4()),
            district_id: Some(Uuid::new_v4()),
            date_start: Some(date("2024-06-01")),
            date_end: Some(date("2024-06-03")),
            experience_type: Some(ExperienceType::Culture),
            effort_level: Level::Medio,
            budget_level: Level::Bajo,
            priority: Some(Priority::Culture),
        }
    }

    #[test]
    fn day_count_is_inclusive() {
        assert_eq!(complete().day_count(), Some(3));

        let mut same_day = complete();
        same_day.date_end = same_day.date_start;
        assert_eq!(same_day.day_count(), Some(1));
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let mut trip = complete();
        trip.date_start = Some(date("2024-06-05"));
        trip.date_end = Some(date("2024-06-01"));

        assert!(trip.has_invalid_date_range());
        assert_eq!(trip.day_count(), None);
        assert!(!trip.is_complete());
        assert_eq!(trip.wizard_step(), 4);
        assert!(matches!(trip.validate(), Err(TripError::InvalidDateRange { .. })));
    }

    #[test]
    fn wizard_advances_as_fields_fill_in() {
        let mut trip = TripRequest::default();
        assert_eq!(trip.wizard_step(), 1);

        let full = complete();
        trip.province_id = full.province_id;
        trip.district_id = full.district_id;
        assert_eq!(trip.wizard_step(), 2);

        trip.date_start = full.date_start;
        trip.date_end = full.date_end;
        assert_eq!(trip.wizard_step(), 3);

        trip.experience_type = full.experience_type;
        assert_eq!(trip.wizard_step(), 4);

        trip.priority = full.priority;
        assert_eq!(trip.wizard_step(), 5);
        assert!(trip.is_complete());
    }

    #[test]
    fn validation_reports_the_first_missing_piece() {
        assert_eq!(TripRequest::default().validate(), Err(TripError::MissingLocation));

        let mut trip = complete();
        trip.experience_type = None;
        assert_eq!(trip.validate(), Err(TripError::MissingExperience));

        let mut trip = complete();
        trip.date_end = None;
        assert_eq!(trip.validate(), Err(TripError::MissingDates));
    }

    #[test]
    fn valid_trip_builds_an_inclusive_filter() {
        let valid = complete().validate().unwrap();
        assert_eq!(valid.days, 3);

        let filter = valid.destination_filter();
        assert_eq!(filter.max_effort, Level::Medio);
        assert_eq!(filter.max_budget, Level::Bajo);
        assert_eq!(filter.experience_type, ExperienceType::Culture);
    }

    #[test]
    fn form_json_with_blank_fields_deserializes() {
        let trip: TripRequest = serde_json::from_value(json!({
            "provinceId": "",
            "districtId": "",
            "dateStart": "",
            "dateEnd": "",
            "experience_type": "",
            "effort_level": 2,
            "price_range": 2,
            "priority": ""
        }))
        .unwrap();
        assert_eq!(trip, TripRequest::default());
    }

    #[test]
    fn form_json_with_values_deserializes() {
        let province = Uuid::new_v4();
        let district = Uuid::new_v4();
        let trip: TripRequest = serde_json::from_value(json!({
            "provinceId": province.to_string(),
            "districtId": district.to_string(),
            "dateStart": "2024-06-01",
            "dateEnd": "2024-06-03",
            "experience_type": "gastronomía",
            "effort_level": 3,
            "price_range": 1,
            "priority": "comodidad"
        }))
        .unwrap();

        assert_eq!(trip.province_id, Some(province));
        assert_eq!(trip.experience_type, Some(ExperienceType::Gastronomy));
        assert_eq!(trip.effort_level, Level::Alto);
        assert_eq!(trip.budget_level, Level::Bajo);
        assert_eq!(trip.priority, Some(Priority::Comfort));
        assert!(trip.is_complete());
    }

    #[test]
    fn out_of_range_levels_are_rejected() {
        let result = serde_json::from_value::<TripRequest>(json!({ "effort_level": 4 }));
        assert!(result.is_err());
    }
}
