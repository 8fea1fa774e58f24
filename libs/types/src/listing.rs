//! Listing records
//!
//! A `Listing` is the finalized, immutable record the store hands out. A
//! `NewListing` is what a client submits: the same fields without an id.
//! Submissions arrive as loose JSON and go through `NewListing::from_json`,
//! which reports every bad field at once instead of failing on the first.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ValidationErrors;
use crate::ids::ListingId;

/// Finalized listing with a store-assigned id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub description: String,
    /// Serialized as a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image_url: String,
}

/// A listing submission before id assignment
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
}

impl NewListing {
    /// Validate a submitted JSON body.
    ///
    /// Any `id` in the body is ignored; the store assigns ids. Rules:
    /// - `title`: required string, not blank
    /// - `description`: required string
    /// - `price`: required number, not negative, at most `Decimal::MAX`
    /// - `image_url`: required string, not interpreted
    pub fn from_json(body: &Value) -> Result<Self, ValidationErrors> {
        let Some(object) = body.as_object() else {
            return Err(ValidationErrors::single("body", "expected a JSON object"));
        };

        let mut errors = ValidationErrors::new();

        let title = required_string(object, "title", &mut errors);
        if let Some(title) = &title {
            if title.trim().is_empty() {
                errors.push("title", "must not be empty");
            }
        }
        let description = required_string(object, "description", &mut errors);
        let price = required_price(object, &mut errors);
        let image_url = required_string(object, "image_url", &mut errors);

        match (title, description, price, image_url) {
            (Some(title), Some(description), Some(price), Some(image_url)) if errors.is_empty() => {
                Ok(Self {
                    title,
                    description,
                    price,
                    image_url,
                })
            }
            _ => Err(errors),
        }
    }

    /// Finalize with the id assigned by the store.
    pub fn into_listing(self, id: ListingId) -> Listing {
        Listing {
            id,
            title: self.title,
            description: self.description,
            price: self.price,
            image_url: self.image_url,
        }
    }
}

fn required_string(
    object: &Map<String, Value>,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    match object.get(field) {
        None | Some(Value::Null) => {
            errors.push(field, "field required");
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(field, "must be a string");
            None
        }
    }
}

fn required_price(object: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<Decimal> {
    let number = match object.get("price") {
        None | Some(Value::Null) => {
            errors.push("price", "field required");
            return None;
        }
        Some(Value::Number(n)) => n,
        Some(_) => {
            errors.push("price", "must be a number");
            return None;
        }
    };

    let price = if let Some(v) = number.as_u64() {
        Some(Decimal::from(v))
    } else if let Some(v) = number.as_i64() {
        Some(Decimal::from(v))
    } else {
        number.as_f64().and_then(Decimal::from_f64)
    };

    // Decimal tops out near 7.9e28; anything larger cannot be stored exactly.
    match price {
        None => {
            errors.push("price", "exceeds the supported range");
            None
        }
        Some(p) if p.is_sign_negative() && !p.is_zero() => {
            errors.push("price", "must not be negative");
            None
        }
        Some(p) => Some(p),
    }
}
