//! Deserialization helpers that normalize older stored shapes
//!
//! Older writers stored months and years as strings and wrapped goal and
//! plan items in a single-field object. Everything is normalized here, once,
//! so the rest of the crate only sees the canonical shape.

use crate::documents::{GoalItem, PlanItem};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumberOrText {
    fn into_i64<E: serde::de::Error>(self, field: &str) -> Result<i64, E> {
        match self {
            Self::Int(v) => Ok(v),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float(v) if v.fract() == 0.0 && v.is_finite() => Ok(v as i64),
            Self::Float(v) => Err(E::custom(format!("{field} must be whole, got {v}"))),
            Self::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("{field} is not a number: {text:?}"))),
        }
    }

    fn into_f64<E: serde::de::Error>(self, field: &str) -> Result<f64, E> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Int(v) => Ok(v as f64),
            Self::Float(v) => Ok(v),
            Self::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("{field} is not a number: {text:?}"))),
        }
    }
}

pub(crate) fn month<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = NumberOrText::deserialize(deserializer)?.into_i64::<D::Error>("month")?;
    match u8::try_from(value) {
        Ok(m) if (1..=12).contains(&m) => Ok(m),
        _ => Err(D::Error::custom(format!("month out of range: {value}"))),
    }
}

pub(crate) fn year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let value = NumberOrText::deserialize(deserializer)?.into_i64::<D::Error>("year")?;
    i32::try_from(value).map_err(|_| D::Error::custom(format!("year out of range: {value}")))
}

pub(crate) fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    NumberOrText::deserialize(deserializer)?.into_f64("value")
}

pub(crate) fn optional_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(raw) => raw.into_f64("target").map(Some),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GoalItemShape {
    Wrapped { goal: GoalItem },
    Bare(GoalItem),
}

pub(crate) fn goal_items<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<GoalItem>, D::Error> {
    let shapes = Option::<Vec<GoalItemShape>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(shapes
        .into_iter()
        .map(|shape| match shape {
            GoalItemShape::Wrapped { goal } | GoalItemShape::Bare(goal) => goal,
        })
        .collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlanItemShape {
    Wrapped { item: PlanItem },
    Bare(PlanItem),
}

pub(crate) fn plan_items<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<PlanItem>, D::Error> {
    let shapes = Option::<Vec<PlanItemShape>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(shapes
        .into_iter()
        .map(|shape| match shape {
            PlanItemShape::Wrapped { item } | PlanItemShape::Bare(item) => item,
        })
        .collect())
}
