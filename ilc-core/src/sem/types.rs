//! The shared type system (spec §4.6): primitives, arrays, optionals, and
//! arena-allocated references to user-declared classes and interfaces.
//! The `Primitive` enum's shape mirrors the teacher's own CLI primitive
//! table, restricted to what the BASIC/Pascal/Zia frontends actually emit.

use crate::sem::class::{ClassDef, InterfaceDef};
use std::fmt::{self, Display, Formatter};

/// An enum type's ordered member list with assigned ordinals (spec §3:
/// "enum (ordered values + assigned ordinals)"). Arena-allocated alongside
/// `ClassDef`/`InterfaceDef` so `Type::Enum` can hold a plain reference.
#[derive(Debug, Clone)]
pub struct EnumDef<'l> {
	pub name: &'l str,
	pub members: &'l [(&'l str, i64)],
}

impl<'l> EnumDef<'l> {
	pub fn ordinal_of(&self, member: &str) -> Option<i64> {
		self.members.iter().find(|(name, _)| name.eq_ignore_ascii_case(member)).map(|(_, v)| *v)
	}
}

/// A record type's ordered, named fields (spec §3: "record with ordered
/// fields"). Unlike `ClassDef` a record has no identity, virtual dispatch or
/// inheritance, so it is represented structurally rather than by reference.
pub type RecordField<'l> = (&'l str, Type<'l>);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Primitive {
	Void,
	Bool,
	Char,
	Int8,
	Int16,
	Int32,
	Int64,
	UInt8,
	UInt16,
	UInt32,
	UInt64,
	Float32,
	Float64,
	/// The runtime's boxed reference string type (`Viper.String`).
	Str,
	/// The universal reference supertype (`Viper.Object`).
	Object,
}

impl Primitive {
	/// Ordinal types are legal `for`-loop counters and `case`/array indices
	/// (spec §7 `NonOrdinalForVar`/`NonOrdinalIndex`).
	pub fn is_ordinal(self) -> bool {
		matches!(
			self,
			Primitive::Bool
				| Primitive::Char
				| Primitive::Int8
				| Primitive::Int16
				| Primitive::Int32
				| Primitive::Int64
				| Primitive::UInt8
				| Primitive::UInt16
				| Primitive::UInt32
				| Primitive::UInt64
		)
	}

	pub fn is_numeric(self) -> bool {
		self.is_ordinal() && self != Primitive::Bool && self != Primitive::Char || self.is_float()
	}

	pub fn is_float(self) -> bool {
		matches!(self, Primitive::Float32 | Primitive::Float64)
	}
}

impl Display for Primitive {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let name = match self {
			Primitive::Void => "void",
			Primitive::Bool => "bool",
			Primitive::Char => "char",
			Primitive::Int8 => "int8",
			Primitive::Int16 => "int16",
			Primitive::Int32 => "int32",
			Primitive::Int64 => "int64",
			Primitive::UInt8 => "uint8",
			Primitive::UInt16 => "uint16",
			Primitive::UInt32 => "uint32",
			Primitive::UInt64 => "uint64",
			Primitive::Float32 => "float32",
			Primitive::Float64 => "float64",
			Primitive::Str => "Viper.String",
			Primitive::Object => "Viper.Object",
		};
		f.write_str(name)
	}
}

/// A fully resolved type. Arena-allocated so that equal types compare by
/// reference where it matters (classes/interfaces use identity equality via
/// [`crate::sem::class`]); `Array`/`Optional` wrap a `'l`-allocated `Type`.
#[derive(Debug, Copy, Clone)]
pub enum Type<'l> {
	Primitive(Primitive),
	Class(&'l ClassDef<'l>),
	Interface(&'l InterfaceDef<'l>),
	Array(&'l Type<'l>),
	/// A nilable wrapper. Never nests: constructing `Optional(Optional(_))`
	/// is rejected by the analyzer (`ErrorKind::DoubleOptionalRejected`).
	Optional(&'l Type<'l>),
	/// Ordered, named fields; spec §3 composite "record with ordered fields".
	Record(&'l [RecordField<'l>]),
	/// `set of T`; spec §3 composite "set-of-T".
	Set(&'l Type<'l>),
	/// An ordinal subrange (e.g. `1..10`); spec §3 composite "range". Carries
	/// the range's element (base ordinal) type.
	Range(&'l Type<'l>),
	/// A function/procedure signature, used for procedure-typed values and
	/// parameters; spec §3 "function/procedure signature".
	Function { params: &'l [Type<'l>], return_ty: &'l Type<'l> },
	/// spec §3 "enum (ordered values + assigned ordinals)".
	Enum(&'l EnumDef<'l>),
}

impl<'l> Type<'l> {
	pub fn is_ordinal(&self) -> bool {
		matches!(self, Type::Primitive(p) if p.is_ordinal()) || matches!(self, Type::Enum(_))
	}

	pub fn is_reference_type(&self) -> bool {
		matches!(self, Type::Class(_) | Type::Interface(_) | Type::Primitive(Primitive::Str | Primitive::Object))
	}

	pub fn is_optional(&self) -> bool {
		matches!(self, Type::Optional(_))
	}

	/// Whether `self` can be assigned from a value of type `from` without an
	/// explicit conversion: identical types, or `from` is a class/interface
	/// implementing/extending `self`, `self` is `Optional(T)` and `from` is
	/// assignable to `T` (or is the nil literal, handled by the caller), or
	/// one of the spec's named widenings (Integer → Real, Enum/Range →
	/// Integer).
	pub fn is_assignable_from(&self, from: &Type<'l>) -> bool {
		match (self, from) {
			(Type::Primitive(a), Type::Primitive(b)) => a == b,
			// Integer -> Real / Real? widening (spec §4.6 assignability table).
			(Type::Primitive(a), Type::Primitive(b)) if a.is_float() && b.is_numeric() && !b.is_float() => true,
			// Enum/Range -> Integer widening.
			(Type::Primitive(a), Type::Enum(_)) if a.is_numeric() && !a.is_float() => true,
			(Type::Primitive(a), Type::Range(_)) if a.is_numeric() && !a.is_float() => true,
			(Type::Optional(inner), other) => inner.is_assignable_from(other),
			(Type::Class(a), Type::Class(b)) => std::ptr::eq(*a, *b) || b.is_subclass_of(a),
			(Type::Interface(a), Type::Class(b)) => b.implements(a),
			(Type::Interface(a), Type::Interface(b)) => std::ptr::eq(*a, *b),
			(Type::Array(a), Type::Array(b)) => a.is_assignable_from(b),
			(Type::Set(a), Type::Set(b)) => a.is_assignable_from(b),
			(Type::Range(a), Type::Range(b)) => a.is_assignable_from(b),
			(Type::Enum(a), Type::Enum(b)) => std::ptr::eq(*a, *b),
			(Type::Record(a), Type::Record(b)) => {
				a.len() == b.len() && a.iter().zip(b.iter()).all(|((na, ta), (nb, tb))| na.eq_ignore_ascii_case(nb) && ta.is_assignable_from(tb))
			}
			(Type::Function { params: pa, return_ty: ra }, Type::Function { params: pb, return_ty: rb }) => {
				pa.len() == pb.len() && pa.iter().zip(pb.iter()).all(|(a, b)| a.is_assignable_from(b)) && ra.is_assignable_from(rb)
			}
			_ => false,
		}
	}
}

impl<'l> Display for Type<'l> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Type::Primitive(p) => Display::fmt(p, f),
			Type::Class(c) => f.write_str(c.qualified_name()),
			Type::Interface(i) => f.write_str(i.qualified_name()),
			Type::Array(elem) => write!(f, "{elem}[]"),
			Type::Optional(inner) => write!(f, "{inner}?"),
			Type::Record(fields) => {
				f.write_str("record{")?;
				for (i, (name, ty)) in fields.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{name}: {ty}")?;
				}
				f.write_str("}")
			}
			Type::Set(elem) => write!(f, "set of {elem}"),
			Type::Range(elem) => write!(f, "{elem} range"),
			Type::Function { params, return_ty } => {
				f.write_str("function(")?;
				for (i, p) in params.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "{p}")?;
				}
				write!(f, "): {return_ty}")
			}
			Type::Enum(e) => f.write_str(e.name),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn bool_and_char_are_ordinal_but_not_numeric() {
		assert!(Primitive::Bool.is_ordinal());
		assert!(!Primitive::Bool.is_numeric());
		assert!(Primitive::Int32.is_ordinal());
		assert!(Primitive::Int32.is_numeric());
	}

	#[test]
	fn float_is_numeric_but_not_ordinal() {
		assert!(!Primitive::Float64.is_ordinal());
		assert!(Primitive::Float64.is_numeric());
	}

	#[test]
	fn identical_primitives_are_mutually_assignable() {
		let a = Type::Primitive(Primitive::Int32);
		let b = Type::Primitive(Primitive::Int32);
		assert!(a.is_assignable_from(&b));
	}

	#[test]
	fn optional_accepts_its_inner_type() {
		let inner = Type::Primitive(Primitive::Int32);
		let opt = Type::Optional(&inner);
		assert!(opt.is_assignable_from(&inner));
	}
}
