//! # Validation Module
//!
//! Input validation for the write paths the engine owns: catalog upserts,
//! metal rates, inventory movements and engine settings.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Enclosing service                                            │
//! │  ├── Deserialization, tenant scoping                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: quilate-db services                                          │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE (tenant_id, codigo), (tenant_id, date)                     │
//! │  └── Foreign keys with ON DELETE CASCADE                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use quilate_core::validation::{validate_codigo, validate_movement_quantity};
//!
//! validate_codigo("AN-14K-001").unwrap();
//! validate_movement_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Largest quantity accepted in a single inventory movement.
pub const MAX_MOVEMENT_QUANTITY: i64 = 9_999;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product codigo.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens, underscores and dots only
///
/// ## Example
/// ```rust
/// use quilate_core::validation::validate_codigo;
///
/// assert!(validate_codigo("AR-10K-0032").is_ok());
/// assert!(validate_codigo("").is_err());
/// assert!(validate_codigo("con espacio").is_err());
/// ```
pub fn validate_codigo(codigo: &str) -> ValidationResult<()> {
    let codigo = codigo.trim();

    if codigo.is_empty() {
        return Err(ValidationError::Required {
            field: "codigo".to_string(),
        });
    }

    if codigo.chars().count() > 50 {
        return Err(ValidationError::TooLong {
            field: "codigo".to_string(),
            max: 50,
        });
    }

    if !codigo
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ValidationError::InvalidFormat {
            field: "codigo".to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores and dots".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name (1..=200 characters after trimming).
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a metal type key such as `10k` or `plata`.
pub fn validate_metal_type(metal_type: &str) -> ValidationResult<()> {
    let metal_type = metal_type.trim();

    if metal_type.is_empty() {
        return Err(ValidationError::Required {
            field: "metal_type".to_string(),
        });
    }

    if metal_type.chars().count() > 20 {
        return Err(ValidationError::TooLong {
            field: "metal_type".to_string(),
            max: 20,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the quantity of an inventory movement.
///
/// Direction lives in the movement type, so the quantity is always positive.
pub fn validate_movement_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_MOVEMENT_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_MOVEMENT_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Zero is allowed (regalos, muestras).
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a metal rate per gram in cents. Must be positive.
pub fn validate_rate_cents(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "rate_per_gram".to_string(),
        });
    }

    Ok(())
}

/// Validates a piece weight in milligrams.
pub fn validate_weight_mg(weight_mg: i64) -> ValidationResult<()> {
    if weight_mg <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "weight".to_string(),
        });
    }

    Ok(())
}

/// Validates a percentage expressed in basis points (0..=10000).
pub fn validate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
