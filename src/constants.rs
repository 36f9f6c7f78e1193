//! # Constants and type definitions for Orrery
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **common type
//! aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Astronomical and geophysical constants
//! - Unit conversions (degrees ↔ radians, days ↔ seconds, AU ↔ km)
//! - Epochs of the Julian date system
//! - Layout constants of the NAIF DAF container

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a Julian day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Number of days in a Julian century
pub const DAYS_PER_CENTURY: f64 = 36_525.0;

/// Astronomical Unit in kilometers (IAU 2012)
pub const AU: f64 = 149_597_870.7;

/// Julian date of the J2000.0 epoch (2000-01-01 12:00:00 TT)
pub const J2000: f64 = 2_451_545.0;

/// Conversion factor between Julian Date and Modified Julian Date
pub const JDTOMJD: f64 = 2400000.5;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// Earth equatorial radius in meters (GRS1980/WGS84)
pub const EARTH_MAJOR_AXIS: f64 = 6_378_137.0;

/// Earth polar radius in meters (GRS1980/WGS84)
pub const EARTH_MINOR_AXIS: f64 = 6_356_752.3;

/// Ratio of the sidereal to the solar rotation rate of the Earth
pub const SIDEREAL_RATIO: f64 = 1.00273790934;

/// Earth rotation rate in radians per SI second
pub const EARTH_ROTATION_RATE: f64 = DPI * SIDEREAL_RATIO / SECONDS_PER_DAY;

/// Speed of light in km/s
pub const VLIGHT: f64 = 2.99792458e5;

/// TT − TAI, in seconds
pub const TT_MINUS_TAI: f64 = 32.184;

/// Mean obliquity of the ecliptic at J2000 (IAU 1976), in arcseconds
pub const OBLIQUITY_J2000_ARCSEC: f64 = 84_381.448;

// -------------------------------------------------------------------------------------------------
// DAF container layout
// -------------------------------------------------------------------------------------------------

/// Size in bytes of one physical DAF record
pub const DAF_RECORD_BYTES: usize = 1024;

/// Number of 8-byte words held by one DAF record
pub const DAF_RECORD_WORDS: usize = DAF_RECORD_BYTES / 8;

/// NAIF FTP validation string stored in the file record
pub const FTP_VALIDATION: &[u8; 28] = b"FTPSTR:\r:\n:\r\n:\r\x00:\x81:\x10\xce:ENDFTP";

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in kilometers
pub type Kilometer = f64;
/// Distance in meters
pub type Meter = f64;
/// Seconds of TDB elapsed since J2000, the time argument of SPK kernels
pub type TdbSeconds = f64;
/// NAIF integer body code
pub type NaifId = i32;
