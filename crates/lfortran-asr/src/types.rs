//! The `Type` sum type (§3.1).
use smallvec::SmallVec;

use crate::asr::SymbolId;

/// Bit-width bucket on a numeric/character type. Typically 1, 4, or 8.
pub type Kind = u8;

/// An optional `(lower_bound, length)` pair on one array dimension.
/// Both absent means assumed-shape in that dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimension {
    pub lower: Option<Box<crate::asr::Expr>>,
    pub length: Option<Box<crate::asr::Expr>>,
}

impl Dimension {
    #[must_use]
    pub fn assumed_shape() -> Self {
        Self { lower: None, length: None }
    }

    #[must_use]
    pub fn fixed(lower: crate::asr::Expr, length: crate::asr::Expr) -> Self {
        Self {
            lower: Some(Box::new(lower)),
            length: Some(Box::new(length)),
        }
    }
}

/// Dimensions attached to a type. Empty means scalar.
pub type Dimensions = SmallVec<[Dimension; 2]>;

/// The closed sum type of ASR types (§3.1).
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Integer(Kind, Dimensions),
    Real(Kind, Dimensions),
    Complex(Kind, Dimensions),
    Logical(Kind, Dimensions),
    Character(Kind, Dimensions),
    /// References a `DerivedType` symbol.
    Derived(SymbolId, Dimensions),
    Pointer(Box<Type>),
    Const(Box<Type>),
    CPtr,
    Tuple(Vec<Type>),
    List(Box<Type>),
    Dict(Box<Type>, Box<Type>),
    Union(Vec<Type>),
    Enum(SymbolId),
}

/// Broad numeric/category bucket used by the implicit-cast rule table
/// (§4.2) and by generic-procedure argument matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TypeCategory {
    Integer,
    Real,
    Complex,
    Logical,
    Character,
    Derived,
    Other,
}

impl Type {
    #[must_use]
    pub fn category(&self) -> TypeCategory {
        match self {
            Type::Integer(..) => TypeCategory::Integer,
            Type::Real(..) => TypeCategory::Real,
            Type::Complex(..) => TypeCategory::Complex,
            Type::Logical(..) => TypeCategory::Logical,
            Type::Character(..) => TypeCategory::Character,
            Type::Derived(..) => TypeCategory::Derived,
            Type::Pointer(inner) | Type::Const(inner) => inner.category(),
            Type::CPtr | Type::Tuple(_) | Type::List(_) | Type::Dict(..) | Type::Union(_) | Type::Enum(_) => {
                TypeCategory::Other
            }
        }
    }

    /// `kind` of a scalar numeric type, if applicable.
    #[must_use]
    pub fn kind(&self) -> Option<Kind> {
        match self {
            Type::Integer(k, _)
            | Type::Real(k, _)
            | Type::Complex(k, _)
            | Type::Logical(k, _)
            | Type::Character(k, _) => Some(*k),
            Type::Pointer(inner) | Type::Const(inner) => inner.kind(),
            _ => None,
        }
    }

    /// Rank (number of array dimensions); 0 for a scalar.
    #[must_use]
    pub fn n_dims(&self) -> usize {
        match self {
            Type::Integer(_, d)
            | Type::Real(_, d)
            | Type::Complex(_, d)
            | Type::Logical(_, d)
            | Type::Character(_, d)
            | Type::Derived(_, d) => d.len(),
            Type::Pointer(inner) | Type::Const(inner) => inner.n_dims(),
            _ => 0,
        }
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        self.n_dims() > 0
    }

    /// This type with its dimensions cleared (an array type's element type).
    #[must_use]
    pub fn as_scalar(&self) -> Type {
        match self {
            Type::Integer(k, _) => Type::Integer(*k, Dimensions::new()),
            Type::Real(k, _) => Type::Real(*k, Dimensions::new()),
            Type::Complex(k, _) => Type::Complex(*k, Dimensions::new()),
            Type::Logical(k, _) => Type::Logical(*k, Dimensions::new()),
            Type::Character(k, _) => Type::Character(*k, Dimensions::new()),
            Type::Derived(sym, _) => Type::Derived(*sym, Dimensions::new()),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_dims_reports_rank() {
        let scalar = Type::Integer(4, Dimensions::new());
        assert_eq!(scalar.n_dims(), 0);
        assert!(!scalar.is_array());

        let mut dims = Dimensions::new();
        dims.push(Dimension::assumed_shape());
        let array = Type::Real(8, dims);
        assert_eq!(array.n_dims(), 1);
        assert!(array.is_array());
    }

    #[test]
    fn category_looks_through_pointer_and_const() {
        let inner = Type::Logical(4, Dimensions::new());
        let wrapped = Type::Pointer(Box::new(Type::Const(Box::new(inner))));
        assert_eq!(wrapped.category(), TypeCategory::Logical);
    }
}
