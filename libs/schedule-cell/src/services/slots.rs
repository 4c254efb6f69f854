use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::{ScheduleException, Slot, SlotStatus, WeeklySchedule};

/// Source of booking state for generated slots. No appointment entity
/// exists in this system yet, so the only shipped implementation is
/// [`NoBookings`]; deployments that track appointments plug their own
/// source in here.
pub trait BookingSource {
    fn is_booked(&self, doctor_id: Uuid, slot_start: DateTime<Utc>) -> bool;
}

/// Booking source for a clinic without an appointment ledger: nothing
/// is ever booked.
pub struct NoBookings;

impl BookingSource for NoBookings {
    fn is_booked(&self, _doctor_id: Uuid, _slot_start: DateTime<Utc>) -> bool {
        false
    }
}

/// Weekday index used throughout the schedule store: Monday = 0 through
/// Sunday = 6.
pub fn weekday_index(date: NaiveDate) -> i16 {
    date.weekday().num_days_from_monday() as i16
}

/// Generate the day's slots for one doctor.
///
/// `schedule` is the single active weekly schedule whose weekday matches
/// `date`, or `None` when the doctor does not work that day (empty
/// result). Slots are emitted every `slot_duration_minutes` from
/// `start_time` while the slot start is strictly before `end_time`; a
/// final slot shorter than the full duration is still emitted, matching
/// the window rather than truncating it.
///
/// A slot is `blocked` when any exception covers its start instant
/// (half-open check), otherwise `booked` when the booking source says
/// so, otherwise `available`. Pure function of its arguments.
pub fn generate_slots(
    schedule: Option<&WeeklySchedule>,
    exceptions: &[ScheduleException],
    bookings: &dyn BookingSource,
    date: NaiveDate,
) -> Vec<Slot> {
    let Some(schedule) = schedule else {
        return Vec::new();
    };

    let step = Duration::minutes(i64::from(schedule.slot_duration_minutes.max(1)));

    let mut slots = Vec::new();
    let mut current = schedule.start_time;

    while current < schedule.end_time {
        let slot_start = date.and_time(current).and_utc();

        let status = if exceptions.iter().any(|e| e.covers(slot_start)) {
            SlotStatus::Blocked
        } else if bookings.is_booked(schedule.doctor_id, slot_start) {
            SlotStatus::Booked
        } else {
            SlotStatus::Available
        };

        slots.push(Slot {
            time: current,
            status,
        });

        // NaiveTime wraps at midnight; a rollover means the window is done.
        let (next, rollover) = current.overflowing_add_signed(step);
        if rollover != 0 {
            break;
        }
        current = next;
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExceptionCategory;
    use chrono::NaiveTime;

    fn schedule(
        day_of_week: i16,
        start: (u32, u32),
        end: (u32, u32),
        duration: i32,
    ) -> WeeklySchedule {
        WeeklySchedule {
            id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            day_of_week,
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            slot_duration_minutes: duration,
            active: true,
            created_at: Utc::now(),
        }
    }

    fn exception(doctor_id: Uuid, start: &str, end: &str) -> ScheduleException {
        ScheduleException {
            id: Uuid::new_v4(),
            doctor_id,
            start_at: start.parse().unwrap(),
            end_at: end.parse().unwrap(),
            category: ExceptionCategory::Vacation,
            reason: "out of office".to_string(),
            all_day: false,
            notified: false,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    fn times(slots: &[Slot]) -> Vec<NaiveTime> {
        slots.iter().map(|s| s.time).collect()
    }

    #[test]
    fn hour_window_with_half_hour_slots_yields_two() {
        // 2024-01-01 is a Monday.
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let schedule = schedule(0, (9, 0), (10, 0), 30);

        let slots = generate_slots(Some(&schedule), &[], &NoBookings, date);

        assert_eq!(
            times(&slots),
            vec![
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            ]
        );
        assert!(slots.iter().all(|s| s.status == SlotStatus::Available));
    }

    #[test]
    fn absent_schedule_yields_no_slots() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(generate_slots(None, &[], &NoBookings, date).is_empty());
    }

    #[test]
    fn final_partial_slot_is_emitted() {
        // 75-minute window, 30-minute slots: the 10:00 slot only has 15
        // minutes left in the window but is still offered.
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let schedule = schedule(0, (9, 0), (10, 15), 30);

        let slots = generate_slots(Some(&schedule), &[], &NoBookings, date);

        assert_eq!(
            times(&slots),
            vec![
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn exception_blocks_only_covered_slot_starts() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let schedule = schedule(0, (9, 0), (10, 0), 30);
        let blocked = exception(
            schedule.doctor_id,
            "2024-01-01T09:00:00Z",
            "2024-01-01T09:30:00Z",
        );

        let slots = generate_slots(Some(&schedule), &[blocked], &NoBookings, date);

        assert_eq!(slots[0].status, SlotStatus::Blocked);
        // 09:30 sits exactly on the exception end; half-open, not blocked.
        assert_eq!(slots[1].status, SlotStatus::Available);
    }

    #[test]
    fn morning_exception_leaves_single_late_slot() {
        // Monday 09:00-11:00 with 60-minute slots; 09:00-10:00 blacked
        // out leaves only the 10:00 slot.
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let schedule = schedule(0, (9, 0), (11, 0), 60);
        let blocked = exception(
            schedule.doctor_id,
            "2024-01-01T09:00:00Z",
            "2024-01-01T10:00:00Z",
        );

        let slots = generate_slots(Some(&schedule), &[blocked], &NoBookings, date);

        let available: Vec<_> = slots
            .iter()
            .filter(|s| s.status == SlotStatus::Available)
            .collect();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[test]
    fn booking_source_marks_slots_booked() {
        struct BookedAtNine;
        impl BookingSource for BookedAtNine {
            fn is_booked(&self, _doctor_id: Uuid, slot_start: DateTime<Utc>) -> bool {
                slot_start == "2024-01-01T09:00:00Z".parse::<DateTime<Utc>>().unwrap()
            }
        }

        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let schedule = schedule(0, (9, 0), (10, 0), 30);

        let slots = generate_slots(Some(&schedule), &[], &BookedAtNine, date);

        assert_eq!(slots[0].status, SlotStatus::Booked);
        assert_eq!(slots[1].status, SlotStatus::Available);
    }

    #[test]
    fn exception_takes_precedence_over_booking() {
        struct EverythingBooked;
        impl BookingSource for EverythingBooked {
            fn is_booked(&self, _doctor_id: Uuid, _slot_start: DateTime<Utc>) -> bool {
                true
            }
        }

        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let schedule = schedule(0, (9, 0), (10, 0), 30);
        let blocked = exception(
            schedule.doctor_id,
            "2024-01-01T09:00:00Z",
            "2024-01-01T09:30:00Z",
        );

        let slots = generate_slots(Some(&schedule), &[blocked], &EverythingBooked, date);

        assert_eq!(slots[0].status, SlotStatus::Blocked);
        assert_eq!(slots[1].status, SlotStatus::Booked);
    }

    #[test]
    fn weekday_index_is_monday_based() {
        assert_eq!(
            weekday_index(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            0
        );
        assert_eq!(
            weekday_index(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()),
            6
        );
    }

    #[test]
    fn window_ending_at_midnight_terminates() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut schedule = schedule(0, (23, 0), (23, 59), 30);
        schedule.end_time = NaiveTime::from_hms_opt(23, 59, 59).unwrap();

        let slots = generate_slots(Some(&schedule), &[], &NoBookings, date);

        assert_eq!(
            times(&slots),
            vec![
                NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(23, 30, 0).unwrap(),
            ]
        );
    }
}
