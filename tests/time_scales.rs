use approx::assert_relative_eq;
use orrery::{
    constants::SECONDS_PER_DAY,
    time::{ExtrapolationPolicy, LeapSecondFormat, LeapSecondTable},
    CalendarTime, Instant, TimeScale, TimeScales,
};
use proptest::prelude::*;

/// `a − b` in seconds, without losing the fraction of either.
fn seconds_between(a: (f64, f64), b: (f64, f64)) -> f64 {
    ((a.0 - b.0) + (a.1 - b.1)) * SECONDS_PER_DAY
}

proptest! {
    #[test]
    fn utc_round_trips_through_tt(
        year in 1973i32..2026,
        month in 1u8..=12,
        day in 1u8..=28,
        hour in 0u8..24,
        minute in 0u8..60,
        second in 0.0f64..59.0,
    ) {
        let scales = TimeScales::default();
        let utc = CalendarTime::new(year, month, day, hour, minute, second).unwrap();
        let tt = scales.to_uniform_scale(utc);
        prop_assert!(tt.warning().is_none());

        let back = scales.utc_calendar(&tt);
        let error = seconds_between(back.julian_date(), utc.julian_date());
        prop_assert!(error.abs() < 1e-6, "{utc} came back as {back} ({error} s)");
    }

    #[test]
    fn tdb_round_trips_through_tt(whole in 2_400_000i64..2_500_000, fraction in 0.0f64..1.0) {
        let scales = TimeScales::default();
        let tt = Instant::from_jd_parts(whole as f64, fraction, TimeScale::Tt);
        let tdb = scales.to_kernel_scale(&tt);
        let back = scales.to_uniform_scale(tdb);
        prop_assert!(back.seconds_since(&tt).unwrap().abs() < 1e-9);
    }

    #[test]
    fn other_scales_round_trip(whole in 2_441_400i64..2_461_000, fraction in 0.0f64..1.0) {
        let scales = TimeScales::default();
        let tt = Instant::from_jd_parts(whole as f64, fraction, TimeScale::Tt);
        for scale in [TimeScale::Tai, TimeScale::Ut1, TimeScale::Utc] {
            let there = scales.convert(&tt, scale);
            let back = scales.convert(&there, TimeScale::Tt);
            prop_assert!(back.seconds_since(&tt).unwrap().abs() < 1e-6);
        }
    }
}

#[test]
fn leap_second_is_a_real_second() {
    let scales = TimeScales::default();
    let leap: CalendarTime = "2016-12-31T23:59:60.5Z".parse().unwrap();
    let tt = scales.to_uniform_scale(leap);
    let midnight = scales.utc(2017, 1, 1, 0, 0, 0.0).unwrap();
    assert_relative_eq!(midnight.seconds_since(&tt).unwrap(), 0.5, epsilon = 1e-6);

    let back = scales.utc_calendar(&tt);
    assert_eq!((back.year, back.month, back.day), (2016, 12, 31));
    assert_eq!((back.hour, back.minute), (23, 59));
    assert_relative_eq!(back.second, 60.5, epsilon = 1e-6);
}

#[test]
fn utc_inside_a_leap_second_round_trips() {
    let scales = TimeScales::default();
    let leap: CalendarTime = "2016-12-31T23:59:60.5Z".parse().unwrap();
    let tt = scales.to_uniform_scale(leap);

    let utc = scales.convert(&tt, TimeScale::Utc);
    assert!(utc.is_leap_second());
    let back = scales.convert(&utc, TimeScale::Tt);
    assert!(back.seconds_since(&tt).unwrap().abs() < 1e-6);
    assert_relative_eq!(scales.utc_calendar(&utc).second, 60.5, epsilon = 1e-6);

    // Half a second later the new day has begun.
    let after = scales.convert(&(tt + 0.75 / SECONDS_PER_DAY), TimeScale::Utc);
    assert!(!after.is_leap_second());
    let back = scales.convert(&after, TimeScale::Tt);
    assert_relative_eq!(back.seconds_since(&tt).unwrap(), 0.75, epsilon = 1e-6);
}

#[test]
fn dates_past_the_table_are_extrapolated_with_a_warning() {
    let table = LeapSecondTable::parse(
        "\
#  File expires on 1 January 1980
    41317.0    1  1 1972       10
    41499.0    1  7 1972       11
    41683.0    1  1 1973       12
",
        LeapSecondFormat::Iers,
    )
    .unwrap();
    let scales = TimeScales::new(table);

    let late = scales.utc(1990, 1, 1, 0, 0, 0.0).unwrap();
    let warning = late.warning().expect("extrapolation must be reported");
    assert!(late.jd().is_finite());
    assert!(warning.offset > 12.0);

    let tdb = scales.to_kernel_scale(&late);
    assert_eq!(tdb.warning(), Some(warning));

    let held = TimeScales::new(
        scales
            .leap_seconds()
            .clone()
            .with_policy(ExtrapolationPolicy::Hold),
    );
    let late_held = held.utc(1990, 1, 1, 0, 0, 0.0).unwrap();
    assert_eq!(late_held.warning().unwrap().offset, 12.0);

    assert!(scales.utc(1975, 1, 1, 0, 0, 0.0).unwrap().warning().is_none());
}

#[test]
fn calendar_text_is_validated() {
    assert!("2024-02-30T00:00:00Z".parse::<CalendarTime>().is_err());
    assert!("2024-13-01".parse::<CalendarTime>().is_err());
    let t: CalendarTime = "2024-02-29T12:30:15.25Z".parse().unwrap();
    assert_eq!((t.year, t.month, t.day, t.hour, t.minute), (2024, 2, 29, 12, 30));
    assert_eq!(t.second, 15.25);
}

#[test]
fn hifitime_agrees_on_tt() {
    let scales = TimeScales::default();
    let tt = scales.utc(2024, 4, 8, 18, 0, 0.0).unwrap();
    let epoch = tt.to_epoch().unwrap();
    let again = Instant::from_epoch(epoch);
    assert_relative_eq!(again.seconds_since(&tt).unwrap(), 0.0, epsilon = 1e-5);
}
