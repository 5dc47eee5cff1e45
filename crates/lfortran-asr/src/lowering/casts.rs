//! The implicit-cast rule table (§4.2).
//!
//! Expressed as a `match` on `(source_category, dest_category)` pairs rather
//! than an actual two-dimensional array: most cells are simply
//! unrepresented (caught by Rust's exhaustiveness checking on the categories
//! that matter), and the few real cells read directly off the prose table
//! instead of needing an index computation.
use crate::asr::CastKind;
use crate::types::TypeCategory;

/// Numeric priority used to decide which side of a binary op gets cast up.
/// Higher wins. Non-numeric categories never participate in a priority
/// comparison -- callers check category compatibility first.
#[must_use]
pub fn numeric_priority(category: TypeCategory) -> u8 {
    match category {
        TypeCategory::Complex => 3,
        TypeCategory::Real => 2,
        TypeCategory::Integer => 1,
        TypeCategory::Logical | TypeCategory::Character | TypeCategory::Derived | TypeCategory::Other => 0,
    }
}

/// The cast kind to use when coercing a value of category `from` to a
/// destination of category `to`. `None` means the categories are
/// incompatible -- the caller turns that into a `SemanticError`.
#[must_use]
pub fn cast_kind_for(from: TypeCategory, to: TypeCategory) -> Option<CastKind> {
    use TypeCategory::{Complex, Integer, Logical, Real};
    match (from, to) {
        (Integer, Real) => Some(CastKind::IntegerToReal),
        (Real, Integer) => Some(CastKind::RealToInteger),
        (Real, Complex) => Some(CastKind::RealToComplex),
        (Integer, Complex) => Some(CastKind::IntegerToComplex),
        (Real, Real) => Some(CastKind::RealToReal),
        (Integer, Integer) => Some(CastKind::IntegerToInteger),
        (Complex, Complex) => Some(CastKind::ComplexToComplex),
        (Logical, Integer) => Some(CastKind::LogicalToInteger),
        _ => None,
    }
}

/// Whether `from` can be implicitly coerced to `to` at all (ignoring kind
/// widening within the same category, which is always allowed).
#[must_use]
pub fn is_compatible(from: TypeCategory, to: TypeCategory) -> bool {
    from == to || cast_kind_for(from, to).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_outranks_integer_outranks_logical() {
        assert!(numeric_priority(TypeCategory::Real) > numeric_priority(TypeCategory::Integer));
        assert!(numeric_priority(TypeCategory::Complex) > numeric_priority(TypeCategory::Real));
        assert!(numeric_priority(TypeCategory::Integer) > numeric_priority(TypeCategory::Logical));
    }

    #[test]
    fn character_is_incompatible_with_integer() {
        assert!(!is_compatible(TypeCategory::Character, TypeCategory::Integer));
        assert_eq!(cast_kind_for(TypeCategory::Character, TypeCategory::Integer), None);
    }

    #[test]
    fn integer_to_real_is_the_expected_cast_kind() {
        assert_eq!(
            cast_kind_for(TypeCategory::Integer, TypeCategory::Real),
            Some(CastKind::IntegerToReal)
        );
    }
}
