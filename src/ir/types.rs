//! Shading-language type references.
//!
//! This module defines [`TypeRef`], the type tag carried by variables and
//! expressions, and [`FieldRef`], the reference to a named struct or static
//! field. Types here are references into the target language's type model,
//! not layout descriptions; layout and struct resolution live in the
//! front-end.
//!
//! A variable's believed type may be refined as passes rewrite expressions,
//! which is why variable identity deliberately ignores the type tag (see
//! [`crate::ir::Variable`]).

use std::fmt;

/// A shading-language value type.
///
/// The closed set of types the target language can express for values flowing
/// through a procedure. `Unknown` is a legitimate state during analysis: a
/// pass that cannot determine a type yet leaves `Unknown` in place rather than
/// guessing, and a later rewrite may refine it.
///
/// # Examples
///
/// ```rust
/// use shadelift::ir::TypeRef;
///
/// let vec4 = TypeRef::vector(TypeRef::Float, 4);
/// assert_eq!(vec4.to_string(), "float4");
/// assert!(!vec4.is_scalar());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// No value (procedure with no return value).
    Void,

    /// Boolean.
    Bool,

    /// 32-bit signed integer.
    Int,

    /// 32-bit unsigned integer.
    UInt,

    /// 32-bit floating point.
    Float,

    /// A vector of scalars, e.g. `float4`.
    Vector {
        /// The scalar element type.
        element: Box<TypeRef>,
        /// Number of components (2, 3 or 4 in practice).
        size: u8,
    },

    /// A matrix of floats, e.g. `float4x4`.
    Matrix {
        /// Number of rows.
        rows: u8,
        /// Number of columns.
        cols: u8,
    },

    /// An array of elements, with a length when statically known.
    Array {
        /// The element type.
        element: Box<TypeRef>,
        /// Static length, or `None` for runtime-sized arrays.
        length: Option<u32>,
    },

    /// A named struct type, resolved by the front-end.
    Struct(String),

    /// Not yet determined; may be refined by later passes.
    Unknown,
}

impl TypeRef {
    /// Creates a vector type of `size` components of `element`.
    #[must_use]
    pub fn vector(element: TypeRef, size: u8) -> Self {
        Self::Vector {
            element: Box::new(element),
            size,
        }
    }

    /// Creates an array type of `element`, statically sized when `length` is known.
    #[must_use]
    pub fn array(element: TypeRef, length: Option<u32>) -> Self {
        Self::Array {
            element: Box::new(element),
            length,
        }
    }

    /// Returns `true` if this is a scalar type (`Bool`, `Int`, `UInt`, `Float`).
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, Self::Bool | Self::Int | Self::UInt | Self::Float)
    }

    /// Returns `true` if this is a numeric scalar type.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int | Self::UInt | Self::Float)
    }

    /// Returns `true` if the type has not been determined yet.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Returns the element type of a vector or array, if applicable.
    #[must_use]
    pub fn element(&self) -> Option<&TypeRef> {
        match self {
            Self::Vector { element, .. } | Self::Array { element, .. } => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::UInt => write!(f, "uint"),
            Self::Float => write!(f, "float"),
            Self::Vector { element, size } => write!(f, "{element}{size}"),
            Self::Matrix { rows, cols } => write!(f, "float{rows}x{cols}"),
            Self::Array {
                element,
                length: Some(len),
            } => write!(f, "{element}[{len}]"),
            Self::Array {
                element,
                length: None,
            } => write!(f, "{element}[]"),
            Self::Struct(name) => write!(f, "{name}"),
            Self::Unknown => write!(f, "?"),
        }
    }
}

/// A reference to a named field, either on an object or static.
///
/// Field identity is the owning type name plus the field name; the type tag is
/// carried for emission but does not participate in aliasing decisions (two
/// references to the same owner/name pair are treated as potentially aliasing
/// regardless of their believed types).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// Name of the type that declares the field.
    pub owner: String,
    /// The field name.
    pub name: String,
    /// The field's value type.
    pub ty: TypeRef,
}

impl FieldRef {
    /// Creates a new field reference.
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            ty,
        }
    }

    /// Returns `true` if `other` names the same owner/name pair.
    ///
    /// Used by aliasing checks, which must ignore the type tag.
    #[must_use]
    pub fn same_field(&self, other: &FieldRef) -> bool {
        self.owner == other.owner && self.name == other.name
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(TypeRef::Void.to_string(), "void");
        assert_eq!(TypeRef::Float.to_string(), "float");
        assert_eq!(TypeRef::vector(TypeRef::Float, 3).to_string(), "float3");
        assert_eq!(TypeRef::Matrix { rows: 4, cols: 4 }.to_string(), "float4x4");
        assert_eq!(
            TypeRef::array(TypeRef::Int, Some(8)).to_string(),
            "int[8]"
        );
        assert_eq!(TypeRef::array(TypeRef::Int, None).to_string(), "int[]");
        assert_eq!(TypeRef::Struct("Light".into()).to_string(), "Light");
        assert_eq!(TypeRef::Unknown.to_string(), "?");
    }

    #[test]
    fn test_type_predicates() {
        assert!(TypeRef::Int.is_scalar());
        assert!(TypeRef::Bool.is_scalar());
        assert!(!TypeRef::Bool.is_numeric());
        assert!(TypeRef::Float.is_numeric());
        assert!(!TypeRef::vector(TypeRef::Float, 4).is_scalar());
        assert!(TypeRef::Unknown.is_unknown());
    }

    #[test]
    fn test_element_access() {
        let vec = TypeRef::vector(TypeRef::Float, 2);
        assert_eq!(vec.element(), Some(&TypeRef::Float));

        let arr = TypeRef::array(TypeRef::UInt, None);
        assert_eq!(arr.element(), Some(&TypeRef::UInt));

        assert_eq!(TypeRef::Int.element(), None);
    }

    #[test]
    fn test_field_ref_same_field_ignores_type() {
        let a = FieldRef::new("Light", "intensity", TypeRef::Float);
        let b = FieldRef::new("Light", "intensity", TypeRef::Unknown);
        let c = FieldRef::new("Light", "position", TypeRef::Float);

        assert!(a.same_field(&b));
        assert!(!a.same_field(&c));
        assert_eq!(a.to_string(), "Light.intensity");
    }
}
