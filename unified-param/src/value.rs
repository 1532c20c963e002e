//! Parameter value types.
//!
//! `ParameterValue` is the closed set of things a parameter leaf can hold:
//! scalars, strings, an RGB color and the viewer's rendering-mode enums.
//! Reading a value back as a concrete Rust type goes through
//! [`FromParameterValue`], which fails with a typed error instead of panicking
//! when the variant does not match.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The kind of a parameter value, without its payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParameterType {
    NotSet,
    Bool,
    Integer,
    Double,
    String,
    Color,
    DisplayMode,
    ShadingMode,
    RenderingQuality,
    ShadowMode,
    LightingModel,
    TextureMode,
    BlendMode,
}

/// An RGB color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Clamp every component into `0.0..=1.0`.
    pub fn clamped(self) -> Self {
        Self {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Parses `r,g,b`, with optional surrounding brackets.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches('[').trim_end_matches(']');
        let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(Error::Custom(format!(
                "color '{}' must have exactly 3 components",
                s
            )));
        }
        let mut rgb = [0.0f64; 3];
        for (slot, part) in rgb.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|e| Error::Custom(format!("invalid color component '{}': {}", part, e)))?;
        }
        Ok(Color::rgb(rgb[0], rgb[1], rgb[2]))
    }
}

macro_rules! mode_enum {
    ($(#[$meta:meta])* $name:ident { $default:ident $(, $variant:ident)* $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            Eq,
            Hash,
            Serialize,
            Deserialize,
            strum::Display,
            strum::EnumString,
            strum::EnumIter,
        )]
        #[serde(rename_all = "snake_case")]
        #[strum(serialize_all = "snake_case", ascii_case_insensitive)]
        pub enum $name {
            #[default]
            $default,
            $($variant,)*
        }
    };
}

mode_enum!(
    /// How geometry surfaces are drawn.
    DisplayMode {
        Solid,
        Wireframe,
        HiddenLine,
        SolidWireframe,
        Points,
        FlatLines,
        Transparent,
        NoShading,
    }
);

mode_enum!(ShadingMode {
    Smooth,
    Flat,
    Gouraud,
    Phong,
    Wireframe,
    Points,
});

mode_enum!(RenderingQuality {
    Normal,
    Draft,
    High,
    Ultra,
    Realtime,
});

mode_enum!(ShadowMode {
    Soft,
    None,
    Hard,
    Volumetric,
    Contact,
    Cascade,
});

mode_enum!(LightingModel {
    BlinnPhong,
    Lambert,
    CookTorrance,
    OrenNayar,
    Minnaert,
    Fresnel,
});

mode_enum!(TextureMode {
    Modulate,
    Replace,
    Decal,
    Blend,
});

mode_enum!(BlendMode {
    None,
    Alpha,
    Additive,
    Multiply,
    Screen,
    Overlay,
});

/// A typed parameter value.
///
/// Serialized adjacently tagged: `{"type": "double", "value": 1.5}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    #[default]
    NotSet,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(std::string::String),
    Color(Color),
    DisplayMode(DisplayMode),
    ShadingMode(ShadingMode),
    RenderingQuality(RenderingQuality),
    ShadowMode(ShadowMode),
    LightingModel(LightingModel),
    TextureMode(TextureMode),
    BlendMode(BlendMode),
}

impl ParameterValue {
    /// Returns the parameter type of this value.
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            Self::NotSet => ParameterType::NotSet,
            Self::Bool(_) => ParameterType::Bool,
            Self::Integer(_) => ParameterType::Integer,
            Self::Double(_) => ParameterType::Double,
            Self::String(_) => ParameterType::String,
            Self::Color(_) => ParameterType::Color,
            Self::DisplayMode(_) => ParameterType::DisplayMode,
            Self::ShadingMode(_) => ParameterType::ShadingMode,
            Self::RenderingQuality(_) => ParameterType::RenderingQuality,
            Self::ShadowMode(_) => ParameterType::ShadowMode,
            Self::LightingModel(_) => ParameterType::LightingModel,
            Self::TextureMode(_) => ParameterType::TextureMode,
            Self::BlendMode(_) => ParameterType::BlendMode,
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, Self::NotSet)
    }

    pub fn is_type(&self, type_: ParameterType) -> bool {
        self.parameter_type() == type_
    }

    /// Checked extraction of the active variant as `T`.
    pub fn get<T: FromParameterValue>(&self) -> Result<T> {
        T::from_value(self).ok_or(Error::TypeMismatch {
            expected: T::TYPE,
            found: self.parameter_type(),
        })
    }

    pub fn as_bool(&self) -> Option<bool> {
        bool::from_value(self)
    }

    pub fn as_i64(&self) -> Option<i64> {
        i64::from_value(self)
    }

    pub fn as_f64(&self) -> Option<f64> {
        f64::from_value(self)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        Color::from_value(self)
    }

    /// Convert this value so that it has the same kind as `template`.
    ///
    /// Values that already match are cloned. Integers widen to doubles, whole
    /// doubles narrow to integers, and strings are parsed into the template's
    /// kind. Returns `None` when no conversion applies.
    pub fn coerce_to(&self, template: &ParameterValue) -> Option<ParameterValue> {
        let target = template.parameter_type();
        if self.parameter_type() == target || target == ParameterType::NotSet {
            return Some(self.clone());
        }
        match (self, target) {
            (Self::Integer(i), ParameterType::Double) => Some(Self::Double(*i as f64)),
            (Self::Double(d), ParameterType::Integer) if d.fract() == 0.0 => {
                Some(Self::Integer(*d as i64))
            }
            (Self::String(s), _) => Self::parse_as(s, target).ok(),
            _ => None,
        }
    }

    /// Parse textual input into a value of the given kind.
    pub fn parse_as(text: &str, type_: ParameterType) -> Result<ParameterValue> {
        let text = text.trim();
        let invalid = |e: &dyn fmt::Display| {
            Error::Custom(format!("cannot parse '{}' as {}: {}", text, type_, e))
        };
        let value = match type_ {
            ParameterType::NotSet => Self::NotSet,
            ParameterType::Bool => Self::Bool(text.parse().map_err(|e| invalid(&e))?),
            ParameterType::Integer => Self::Integer(text.parse().map_err(|e| invalid(&e))?),
            ParameterType::Double => Self::Double(text.parse().map_err(|e| invalid(&e))?),
            ParameterType::String => Self::String(text.to_string()),
            ParameterType::Color => Self::Color(text.parse()?),
            ParameterType::DisplayMode => Self::DisplayMode(text.parse().map_err(|e| invalid(&e))?),
            ParameterType::ShadingMode => Self::ShadingMode(text.parse().map_err(|e| invalid(&e))?),
            ParameterType::RenderingQuality => {
                Self::RenderingQuality(text.parse().map_err(|e| invalid(&e))?)
            }
            ParameterType::ShadowMode => Self::ShadowMode(text.parse().map_err(|e| invalid(&e))?),
            ParameterType::LightingModel => {
                Self::LightingModel(text.parse().map_err(|e| invalid(&e))?)
            }
            ParameterType::TextureMode => Self::TextureMode(text.parse().map_err(|e| invalid(&e))?),
            ParameterType::BlendMode => Self::BlendMode(text.parse().map_err(|e| invalid(&e))?),
        };
        Ok(value)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSet => write!(f, "<not set>"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{:?}", v),
            Self::Color(v) => write!(f, "{}", v),
            Self::DisplayMode(v) => write!(f, "{}", v),
            Self::ShadingMode(v) => write!(f, "{}", v),
            Self::RenderingQuality(v) => write!(f, "{}", v),
            Self::ShadowMode(v) => write!(f, "{}", v),
            Self::LightingModel(v) => write!(f, "{}", v),
            Self::TextureMode(v) => write!(f, "{}", v),
            Self::BlendMode(v) => write!(f, "{}", v),
        }
    }
}

/// Types that can be read out of a [`ParameterValue`].
pub trait FromParameterValue: Sized {
    /// The variant kind this type is stored as.
    const TYPE: ParameterType;

    fn from_value(value: &ParameterValue) -> Option<Self>;
}

macro_rules! value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromParameterValue for $ty {
                const TYPE: ParameterType = ParameterType::$variant;

                fn from_value(value: &ParameterValue) -> Option<Self> {
                    match value {
                        ParameterValue::$variant(v) => Some(v.clone()),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for ParameterValue {
                fn from(v: $ty) -> Self {
                    ParameterValue::$variant(v)
                }
            }
        )*
    };
}

value_conversions! {
    bool => Bool,
    i64 => Integer,
    f64 => Double,
    std::string::String => String,
    Color => Color,
    DisplayMode => DisplayMode,
    ShadingMode => ShadingMode,
    RenderingQuality => RenderingQuality,
    ShadowMode => ShadowMode,
    LightingModel => LightingModel,
    TextureMode => TextureMode,
    BlendMode => BlendMode,
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        ParameterValue::Integer(v as i64)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::String(v.to_string())
    }
}

/// A parameter path together with the value it changed to.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterChange {
    pub path: std::string::String,
    pub value: ParameterValue,
}

impl ParameterChange {
    pub fn new(path: impl Into<std::string::String>, value: ParameterValue) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }
}
