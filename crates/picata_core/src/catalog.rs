//! crates/picata_core/src/catalog.rs
//!
//! Turns the raw LMS course listing into the instructor's course directory:
//! resolved display names and a current/past split against wall-clock time.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::domain::{Course, CourseListing, CourseTerm, UNKNOWN_COURSE};

const CANVAS_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A course that could not be placed in the directory, with the reason shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCourse {
    pub course_id: u64,
    pub reason: String,
}

/// The classified course listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CourseDirectory {
    pub current: Vec<Course>,
    pub past: Vec<Course>,
    pub skipped: Vec<SkippedCourse>,
}

impl CourseDirectory {
    /// Courses of the given term that can be offered for selection.
    pub fn selectable(&self, term: CourseTerm) -> Vec<&Course> {
        let courses = match term {
            CourseTerm::Current => &self.current,
            CourseTerm::Past => &self.past,
        };
        courses.iter().filter(|c| c.name != UNKNOWN_COURSE).collect()
    }
}

/// Picks the first present, non-blank field of name, course code and SIS id.
pub fn resolve_display_name(listing: &CourseListing) -> String {
    [&listing.name, &listing.course_code, &listing.sis_course_id]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_COURSE)
        .to_string()
}

/// A course is past only once its end has strictly passed.
pub fn classify(end_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> CourseTerm {
    match end_at {
        Some(end) if end < now => CourseTerm::Past,
        _ => CourseTerm::Current,
    }
}

/// Parses an LMS timestamp. Blank values count as absent.
pub fn parse_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, CANVAS_TIMESTAMP_FORMAT) {
        return Ok(Some(naive.and_utc()));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}

/// Resolves the display name and parses both timestamps of one listing.
pub fn to_course(listing: &CourseListing) -> Result<Course, String> {
    let start_at = parse_timestamp(listing.start_at.as_deref())
        .map_err(|e| format!("start date: {}", e))?;
    let end_at =
        parse_timestamp(listing.end_at.as_deref()).map_err(|e| format!("end date: {}", e))?;

    Ok(Course {
        id: listing.id,
        name: resolve_display_name(listing),
        start_at,
        end_at,
    })
}

/// Splits the listing into current and past courses, preserving LMS order.
///
/// A course with a malformed timestamp is reported in `skipped`; the rest of the
/// listing is still processed.
pub fn build_directory(listings: &[CourseListing], now: DateTime<Utc>) -> CourseDirectory {
    let mut directory = CourseDirectory::default();

    for listing in listings {
        match to_course(listing) {
            Ok(course) => match classify(course.end_at, now) {
                CourseTerm::Current => directory.current.push(course),
                CourseTerm::Past => directory.past.push(course),
            },
            Err(reason) => {
                warn!("Error processing course {}: {}", listing.id, reason);
                directory.skipped.push(SkippedCourse {
                    course_id: listing.id,
                    reason,
                });
            }
        }
    }

    directory
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
    }

    fn listing(id: u64, name: Option<&str>, end_at: Option<&str>) -> CourseListing {
        CourseListing {
            id,
            name: name.map(String::from),
            end_at: end_at.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn name_falls_back_in_order() {
        let mut l = CourseListing {
            id: 1,
            name: None,
            course_code: Some("CS 201".into()),
            sis_course_id: Some("SIS-9".into()),
            ..Default::default()
        };
        assert_eq!(resolve_display_name(&l), "CS 201");

        l.course_code = None;
        assert_eq!(resolve_display_name(&l), "SIS-9");

        l.sis_course_id = None;
        assert_eq!(resolve_display_name(&l), UNKNOWN_COURSE);

        l.name = Some("Discrete Math".into());
        l.course_code = Some("CS 201".into());
        assert_eq!(resolve_display_name(&l), "Discrete Math");
    }

    #[test]
    fn blank_name_is_treated_as_absent() {
        let l = CourseListing {
            id: 1,
            name: Some("   ".into()),
            course_code: Some("ALG".into()),
            ..Default::default()
        };
        assert_eq!(resolve_display_name(&l), "ALG");
    }

    #[test]
    fn ended_course_is_past_and_open_course_is_current() {
        let listings = vec![
            listing(1, Some("Old"), Some("2020-01-01T00:00:00Z")),
            listing(2, Some("Open"), None),
            listing(3, Some("Future"), Some("2030-06-01T00:00:00Z")),
        ];
        let dir = build_directory(&listings, now());

        assert_eq!(dir.past.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(dir.current.iter().map(|c| c.id).collect::<Vec<_>>(), vec![2, 3]);
        assert!(dir.skipped.is_empty());
    }

    #[test]
    fn end_equal_to_now_is_still_current() {
        assert_eq!(classify(Some(now()), now()), CourseTerm::Current);
    }

    #[test]
    fn malformed_dates_skip_only_that_course() {
        let mut bad_start = listing(2, Some("Bad start"), None);
        bad_start.start_at = Some("yesterday".into());
        let listings = vec![
            listing(1, Some("Good"), None),
            bad_start,
            listing(3, Some("Bad end"), Some("01/02/2020")),
            listing(4, Some("Also good"), Some("2019-05-05T10:00:00Z")),
        ];
        let dir = build_directory(&listings, now());

        assert_eq!(dir.current.len(), 1);
        assert_eq!(dir.past.len(), 1);
        let skipped: Vec<u64> = dir.skipped.iter().map(|s| s.course_id).collect();
        assert_eq!(skipped, vec![2, 3]);
        assert!(dir.skipped[0].reason.starts_with("start date"));
    }

    #[test]
    fn offset_timestamps_are_accepted() {
        let parsed = parse_timestamp(Some("2020-01-01T02:00:00+02:00")).unwrap();
        assert_eq!(parsed, Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn unknown_courses_are_not_selectable() {
        let listings = vec![listing(1, None, None), listing(2, Some("Graphs"), None)];
        let dir = build_directory(&listings, now());

        assert_eq!(dir.current.len(), 2);
        let names: Vec<&str> = dir
            .selectable(CourseTerm::Current)
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Graphs"]);
    }
}
