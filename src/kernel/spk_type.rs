use std::{convert::TryFrom, fmt};

use crate::orrery_errors::OrreryError;

/// SPK segment data types registered by NAIF.
///
/// Only the two fixed-interval Chebyshev types can be evaluated, see
/// [`SpkDataType::chebyshev_components`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum SpkDataType {
    ModifiedDifferenceArray = 1,
    ChebyshevPositionOnly = 2,
    ChebyshevPositionVelocity = 3,
    TwoBodyDiscreteStates = 5,
    EquallySpacedLagrange = 8,
    UnequallySpacedLagrange = 9,
    TwoLineElements = 10,
    HermiteUniform = 12,
    HermiteNonUniform = 13,
    ChebyshevNonUniform = 14,
    PrecessingConic = 15,
    EquinoctialElements = 17,
    ESAHermiteLagrange = 18,
    ESAPiecewiseInterpolation = 19,
    ChebyshevVelocityOnly = 20,
    ExtendedModifiedDifferenceArray = 21,
}

impl SpkDataType {
    pub fn from_i32(value: i32) -> Result<Self, OrreryError> {
        SpkDataType::try_from(value)
    }

    pub fn to_i32(self) -> i32 {
        self as i32
    }

    /// Number of Chebyshev series stored per record, or `None` when the type is
    /// not a fixed-interval Chebyshev type.
    ///
    /// Type 2 carries the three position components, type 3 adds three
    /// velocity components.
    pub fn chebyshev_components(self) -> Option<usize> {
        match self {
            SpkDataType::ChebyshevPositionOnly => Some(3),
            SpkDataType::ChebyshevPositionVelocity => Some(6),
            _ => None,
        }
    }
}

impl From<SpkDataType> for i32 {
    fn from(data_type: SpkDataType) -> Self {
        data_type as i32
    }
}

impl TryFrom<i32> for SpkDataType {
    type Error = OrreryError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        use SpkDataType::*;
        match value {
            1 => Ok(ModifiedDifferenceArray),
            2 => Ok(ChebyshevPositionOnly),
            3 => Ok(ChebyshevPositionVelocity),
            5 => Ok(TwoBodyDiscreteStates),
            8 => Ok(EquallySpacedLagrange),
            9 => Ok(UnequallySpacedLagrange),
            10 => Ok(TwoLineElements),
            12 => Ok(HermiteUniform),
            13 => Ok(HermiteNonUniform),
            14 => Ok(ChebyshevNonUniform),
            15 => Ok(PrecessingConic),
            17 => Ok(EquinoctialElements),
            18 => Ok(ESAHermiteLagrange),
            19 => Ok(ESAPiecewiseInterpolation),
            20 => Ok(ChebyshevVelocityOnly),
            21 => Ok(ExtendedModifiedDifferenceArray),
            _ => Err(OrreryError::InvalidSpkDataType(value)),
        }
    }
}

impl fmt::Display for SpkDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SpkDataType::ModifiedDifferenceArray => "Modified Difference Array",
            SpkDataType::ChebyshevPositionOnly => "Chebyshev Position Only",
            SpkDataType::ChebyshevPositionVelocity => "Chebyshev Position Velocity",
            SpkDataType::TwoBodyDiscreteStates => "Two Body Discrete States",
            SpkDataType::EquallySpacedLagrange => "Equally Spaced Lagrange",
            SpkDataType::UnequallySpacedLagrange => "Unequally Spaced Lagrange",
            SpkDataType::TwoLineElements => "Two Line Elements",
            SpkDataType::HermiteUniform => "Hermite Uniform",
            SpkDataType::HermiteNonUniform => "Hermite Non Uniform",
            SpkDataType::ChebyshevNonUniform => "Chebyshev Non Uniform",
            SpkDataType::PrecessingConic => "Precessing Conic",
            SpkDataType::EquinoctialElements => "Equinoctial Elements",
            SpkDataType::ESAHermiteLagrange => "ESA Hermite Lagrange",
            SpkDataType::ESAPiecewiseInterpolation => "ESA Piecewise Interpolation",
            SpkDataType::ChebyshevVelocityOnly => "Chebyshev Velocity Only",
            SpkDataType::ExtendedModifiedDifferenceArray => "Extended Modified Difference Array",
        };
        write!(f, "{s}")
    }
}
