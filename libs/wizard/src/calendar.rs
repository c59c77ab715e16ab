use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::models::WorkingDay;

/// The month currently shown in the date picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthCursor {
    first: NaiveDate,
}

impl MonthCursor {
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    /// Move `delta` months forward (or back when negative).
    pub fn shift(&mut self, delta: i32) {
        let months = Months::new(delta.unsigned_abs());
        let moved = if delta >= 0 {
            self.first.checked_add_months(months)
        } else {
            self.first.checked_sub_months(months)
        };
        if let Some(first) = moved {
            self.first = first;
        }
    }

    /// "March 2026".
    pub fn label(&self) -> String {
        self.first.format("%B %Y").to_string()
    }

    pub fn days_in_month(&self) -> u32 {
        self.first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .map(|last| last.day())
            .unwrap_or(28)
    }

    /// Sunday-first grid: leading `None`s so day 1 lands in its weekday column.
    pub fn grid(&self) -> Vec<Option<NaiveDate>> {
        let lead = self.first.weekday().num_days_from_sunday() as usize;
        let mut cells: Vec<Option<NaiveDate>> = vec![None; lead];
        cells.extend(
            (0..self.days_in_month())
                .map(|offset| self.first + chrono::Days::new(u64::from(offset)))
                .map(Some),
        );
        cells
    }
}

/// Schedule entry for `date`'s weekday, if the business publishes one.
pub fn schedule_for<'a>(date: NaiveDate, hours: &'a [WorkingDay]) -> Option<&'a WorkingDay> {
    let weekday = date.weekday().num_days_from_sunday();
    hours.iter().find(|d| u32::from(d.day_of_week) == weekday)
}

/// Open on that weekday. A business without a published schedule is treated as always open.
pub fn is_working_day(date: NaiveDate, hours: Option<&[WorkingDay]>) -> bool {
    match hours {
        None => true,
        Some(hours) => schedule_for(date, hours).is_some_and(|d| d.is_open),
    }
}

pub fn is_bookable_date(date: NaiveDate, today: NaiveDate, hours: Option<&[WorkingDay]>) -> bool {
    date >= today && is_working_day(date, hours)
}

/// "10:00 - 14:00, 15:00 - 19:00", or "Closed".
pub fn working_hours_label(date: NaiveDate, hours: &[WorkingDay]) -> String {
    match schedule_for(date, hours) {
        Some(day) if day.is_open && !day.shifts.is_empty() => day
            .shifts
            .iter()
            .map(|s| format!("{} - {}", s.start_time, s.end_time))
            .collect::<Vec<_>>()
            .join(", "),
        _ => "Closed".into(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCell {
    pub date: NaiveDate,
    pub day: u32,
    pub selectable: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarView {
    pub label: String,
    pub month: NaiveDate,
    pub cells: Vec<Option<DayCell>>,
}

pub fn calendar_view(
    cursor: MonthCursor,
    today: NaiveDate,
    hours: Option<&[WorkingDay]>,
    selected: Option<NaiveDate>,
) -> CalendarView {
    let cells = cursor
        .grid()
        .into_iter()
        .map(|cell| {
            cell.map(|date| DayCell {
                date,
                day: date.day(),
                selectable: is_bookable_date(date, today, hours),
                selected: selected == Some(date),
            })
        })
        .collect();
    CalendarView {
        label: cursor.label(),
        month: cursor.first_day(),
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Shift;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn open(day_of_week: u8, shifts: &[(&str, &str)]) -> WorkingDay {
        WorkingDay {
            day_of_week,
            is_open: true,
            shifts: shifts
                .iter()
                .map(|(s, e)| Shift {
                    start_time: s.to_string(),
                    end_time: e.to_string(),
                })
                .collect(),
        }
    }

    // ── grid ──

    #[test]
    fn test_grid_leading_blanks() {
        // 1 March 2026 is a Sunday
        let march = MonthCursor::containing(d(2026, 3, 17));
        let grid = march.grid();
        assert_eq!(grid[0], Some(d(2026, 3, 1)));
        assert_eq!(grid.len(), 31);

        // 1 April 2026 is a Wednesday
        let april = MonthCursor::containing(d(2026, 4, 2));
        let grid = april.grid();
        assert_eq!(&grid[..3], &[None, None, None]);
        assert_eq!(grid[3], Some(d(2026, 4, 1)));
        assert_eq!(grid.len(), 3 + 30);
    }

    #[test]
    fn test_days_in_february() {
        assert_eq!(MonthCursor::containing(d(2026, 2, 10)).days_in_month(), 28);
        assert_eq!(MonthCursor::containing(d(2028, 2, 10)).days_in_month(), 29);
    }

    #[test]
    fn test_shift_across_year() {
        let mut c = MonthCursor::containing(d(2026, 12, 5));
        c.shift(1);
        assert_eq!(c.first_day(), d(2027, 1, 1));
        c.shift(-2);
        assert_eq!(c.first_day(), d(2026, 11, 1));
        assert_eq!(c.label(), "November 2026");
    }

    // ── bookable dates ──

    #[test]
    fn test_past_dates_not_bookable() {
        let today = d(2026, 3, 10);
        assert!(!is_bookable_date(d(2026, 3, 9), today, None));
        assert!(is_bookable_date(today, today, None));
    }

    #[test]
    fn test_closed_weekday_not_bookable() {
        let hours = vec![
            open(2, &[("10:00", "18:00")]), // Tuesday
            WorkingDay {
                day_of_week: 3,
                is_open: false,
                shifts: vec![],
            },
        ];
        let today = d(2026, 3, 1);
        // 10 March 2026 is a Tuesday, 11 March a Wednesday, 12 March a Thursday
        assert!(is_bookable_date(d(2026, 3, 10), today, Some(&hours)));
        assert!(!is_bookable_date(d(2026, 3, 11), today, Some(&hours)));
        assert!(!is_bookable_date(d(2026, 3, 12), today, Some(&hours)));
    }

    #[test]
    fn test_working_hours_label() {
        let hours = vec![open(2, &[("10:00", "14:00"), ("15:00", "19:00")])];
        assert_eq!(
            working_hours_label(d(2026, 3, 10), &hours),
            "10:00 - 14:00, 15:00 - 19:00"
        );
        assert_eq!(working_hours_label(d(2026, 3, 11), &hours), "Closed");
    }

    #[test]
    fn test_calendar_view_marks_selection() {
        let today = d(2026, 3, 10);
        let view = calendar_view(MonthCursor::containing(today), today, None, Some(d(2026, 3, 12)));
        let cells: Vec<&DayCell> = view.cells.iter().flatten().collect();
        assert!(!cells[8].selectable); // 9 March
        assert!(cells[9].selectable); // 10 March
        assert!(cells[11].selected);
        assert_eq!(view.label, "March 2026");
    }
}
