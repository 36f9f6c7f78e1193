//! Provenance block found in the comment area of JPL DE kernels.
//!
//! DE kernels carry a short textual description of the integration:
//!
//! ```text
//! JPL planetary and lunar ephemeris DE440
//! Integrated 25 June 2020
//!
//! Time span covered by ephemeris:
//!
//! 31-DEC-1549 00:00 to   25-JAN-2650 00:00
//! JD   2287184.5   to   JD   2688976.5
//! ```
//!
//! [`JplHeader::parse`] extracts the ephemeris name, the integration date and
//! the advertised coverage. The integration date and calendar span are optional
//! since excerpted kernels often drop them.

use std::fmt;

use nom::{
    bytes::complete::{tag, take_until},
    character::complete::{multispace0, not_line_ending, space1},
    combinator::opt,
    number::complete::double,
    IResult, Parser,
};

use crate::constants::{TdbSeconds, J2000, SECONDS_PER_DAY};

/// Provenance of a JPL development ephemeris.
#[derive(Debug, PartialEq, Clone)]
pub struct JplHeader {
    /// Ephemeris name, e.g. `DE440`.
    pub ephemeris: String,
    pub integrated: Option<String>,
    /// Calendar coverage as printed, e.g. `31-DEC-1549 00:00`.
    pub calendar_span: Option<(String, String)>,
    /// Coverage in TDB Julian days.
    pub jd_span: (f64, f64),
}

fn ephemeris_line(input: &str) -> IResult<&str, &str> {
    let (input, _) = take_until("JPL planetary and lunar ephemeris")(input)?;
    let (input, _) = (tag("JPL planetary and lunar ephemeris"), space1).parse(input)?;
    let (input, name) = not_line_ending(input)?;
    Ok((input, name.trim()))
}

fn integrated_line(input: &str) -> IResult<&str, &str> {
    let (input, _) = (multispace0, tag("Integrated ")).parse(input)?;
    let (input, date) = not_line_ending(input)?;
    Ok((input, date.trim()))
}

fn calendar_span(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = take_until("Time span covered by ephemeris:")(input)?;
    let (input, _) = (tag("Time span covered by ephemeris:"), multispace0).parse(input)?;
    let (input, start) = take_until(" to ")(input)?;
    let (input, _) = (tag(" to "), multispace0).parse(input)?;
    let (input, end) = not_line_ending(input)?;
    Ok((input, (start.trim(), end.trim())))
}

fn jd_span(input: &str) -> IResult<&str, (f64, f64)> {
    let (input, _) = take_until("JD ")(input)?;
    let (input, (_, _, start, _, _, _, _, end)) = (
        tag("JD"),
        space1,
        |s| double(s),
        space1,
        tag("to"),
        space1,
        (tag("JD"), space1),
        |s| double(s),
    )
        .parse(input)?;
    Ok((input, (start, end)))
}

impl JplHeader {
    /// Parse the provenance block out of a kernel comment text.
    pub fn parse(input: &str) -> IResult<&str, Self> {
        let (input, ephemeris) = ephemeris_line(input)?;
        let (input, integrated) = opt(integrated_line).parse(input)?;
        let (input, calendar) = opt(calendar_span).parse(input)?;
        let (input, jd) = jd_span(input)?;
        Ok((
            input,
            JplHeader {
                ephemeris: ephemeris.to_string(),
                integrated: integrated.map(str::to_string),
                calendar_span: calendar.map(|(s, e)| (s.to_string(), e.to_string())),
                jd_span: jd,
            },
        ))
    }

    /// Advertised coverage in TDB seconds past J2000.
    pub fn tdb_span(&self) -> (TdbSeconds, TdbSeconds) {
        let to_seconds = |jd: f64| (jd - J2000) * SECONDS_PER_DAY;
        (to_seconds(self.jd_span.0), to_seconds(self.jd_span.1))
    }
}

impl fmt::Display for JplHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("Ephemeris", self.ephemeris.clone()),
            (
                "Integrated",
                self.integrated.clone().unwrap_or_else(|| "-".into()),
            ),
            (
                "Span",
                match &self.calendar_span {
                    Some((start, end)) => format!("{start} .. {end}"),
                    None => "-".into(),
                },
            ),
            (
                "JD span",
                format!("{:.1} .. {:.1}", self.jd_span.0, self.jd_span.1),
            ),
        ];
        let border = format!("+{:-<14}+{:-<42}+", "", "");
        writeln!(f, "{border}")?;
        for (label, value) in rows {
            writeln!(f, "| {label:<12} | {value:<40} |")?;
        }
        writeln!(f, "{border}")
    }
}
